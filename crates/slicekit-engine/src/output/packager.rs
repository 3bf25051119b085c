//! Result packaging
//!
//! A single artifact is delivered as-is. Several artifacts are zipped on the
//! fly under their base file names, in order; each file is copied into the
//! archive in chunks and the archive is written straight to the sink, so
//! neither is held in memory whole.

use crate::workspace::Workspace;
use slicekit_core::constants::ARCHIVE_FILE_NAME;
use slicekit_core::{ExportFormat, Result, SliceError};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Size of the chunks handed to a [`ResultStream`] consumer
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Chunks buffered between the archive writer and the consumer
const STREAM_CHANNEL_DEPTH: usize = 8;

const ZIP_COMPRESSION_LEVEL: i64 = 9;

/// What a job delivers to its caller
#[derive(Debug, Clone, PartialEq)]
pub enum PackagedResult {
    /// Exactly one artifact, delivered unchanged
    Single { path: PathBuf, file_name: String },
    /// Several artifacts bundled into `result.zip`
    Archive {
        file_name: String,
        entries: Vec<PathBuf>,
    },
}

/// Chooses between direct delivery and archiving
pub struct ResultPackager;

impl ResultPackager {
    /// Decide how `artifacts` will be delivered
    ///
    /// No artifacts is an engine failure, never an empty download.
    pub fn package(artifacts: &[PathBuf], format: ExportFormat) -> Result<PackagedResult> {
        match artifacts {
            [] => Err(SliceError::NoArtifacts { format }),
            [single] => Ok(PackagedResult::Single {
                path: single.clone(),
                file_name: base_name(single)?,
            }),
            many => Ok(PackagedResult::Archive {
                file_name: ARCHIVE_FILE_NAME.to_string(),
                entries: many.to_vec(),
            }),
        }
    }
}

fn base_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| SliceError::packaging(format!("artifact has no file name: {}", path.display())))
}

impl PackagedResult {
    /// Name the download should be saved under
    pub fn file_name(&self) -> &str {
        match self {
            Self::Single { file_name, .. } | Self::Archive { file_name, .. } => file_name,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Single { .. } => "application/octet-stream",
            Self::Archive { .. } => "application/zip",
        }
    }

    pub fn is_archive(&self) -> bool {
        matches!(self, Self::Archive { .. })
    }

    /// Stream the result into `writer`
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        match self {
            Self::Single { path, .. } => {
                let mut file = File::open(path).map_err(SliceError::packaging)?;
                io::copy(&mut file, &mut writer).map_err(SliceError::packaging)?;
            }
            Self::Archive { entries, .. } => write_archive(entries, &mut writer)?,
        }
        writer.flush().map_err(SliceError::packaging)
    }

    /// Produce the result as a stream of byte chunks
    ///
    /// The workspace moves into the writer task and is released when writing
    /// ends, whether it completed, failed, or the stream was dropped.
    pub fn into_stream(self, workspace: Workspace) -> ResultStream {
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_DEPTH);
        let file_name = self.file_name().to_string();
        let content_type = self.content_type();

        let task = tokio::task::spawn_blocking(move || {
            let _workspace = workspace;
            let sink = ChannelWriter { tx: tx.clone() };
            let result = self.write_to(BufWriter::with_capacity(STREAM_CHUNK_SIZE, sink));

            if let Err(e) = result {
                if tx.is_closed() {
                    tracing::info!("Result stream closed by receiver");
                } else {
                    tracing::error!(error = %e, "Failed to stream result");
                    let _ = tx.blocking_send(Err(io::Error::other(e.to_string())));
                }
            }
        });

        ResultStream {
            file_name,
            content_type,
            rx,
            task,
        }
    }
}

fn write_archive<W: Write>(entries: &[PathBuf], writer: &mut W) -> Result<()> {
    let mut zip = ZipWriter::new_stream(writer);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(ZIP_COMPRESSION_LEVEL));

    for path in entries {
        let name = base_name(path)?;
        let mut file = File::open(path).map_err(SliceError::packaging)?;
        zip.start_file(name, options).map_err(SliceError::packaging)?;
        io::copy(&mut file, &mut zip).map_err(SliceError::packaging)?;
    }

    zip.finish().map_err(SliceError::packaging)?;
    Ok(())
}

/// Blocking writer feeding an async channel
struct ChannelWriter {
    tx: mpsc::Sender<io::Result<Vec<u8>>>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .blocking_send(Ok(buf.to_vec()))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "result stream closed"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A result being produced in the background
pub struct ResultStream {
    file_name: String,
    content_type: &'static str,
    rx: mpsc::Receiver<io::Result<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl ResultStream {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    /// Next chunk, or `None` once the result is complete
    pub async fn next_chunk(&mut self) -> Option<io::Result<Vec<u8>>> {
        self.rx.recv().await
    }

    /// Copy the whole stream into `writer`
    ///
    /// Returns once the writer task has finished and released its workspace.
    pub async fn copy_to<W: AsyncWrite + Unpin>(mut self, writer: &mut W) -> io::Result<u64> {
        let mut written = 0u64;
        while let Some(chunk) = self.rx.recv().await {
            let chunk = chunk?;
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;
        self.finish().await;
        Ok(written)
    }

    /// Stop consuming and wait for the writer task to wind down
    pub async fn finish(self) {
        let Self { rx, task, .. } = self;
        drop(rx);
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Result writer task failed");
        }
    }
}
