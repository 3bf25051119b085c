//! Runs the slicing engine executable
//!
//! The engine is started with piped stdout/stderr and no stdin, as the
//! leader of its own process group. The job awaits its exit for at most the
//! configured timeout; past that the whole group is killed and the engine
//! reaped before the timeout is reported. Dropping a running job kills the
//! group as well, so helper processes the engine forked never outlive it.

use super::{EngineOutcome, SlicingEngine};
use async_trait::async_trait;
use slicekit_core::{EngineFailure, Result, SliceError};
use slicekit_settings::SlicerConfig;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Runs the engine executable with a wall-clock limit
#[derive(Debug, Clone)]
pub struct EngineInvoker {
    engine_path: PathBuf,
    timeout: Duration,
}

impl EngineInvoker {
    /// Check the engine path and build an invoker
    ///
    /// Fails without spawning anything when the path is unset, or when it
    /// names a file location that does not exist. Bare program names are
    /// left to `PATH` lookup at spawn time.
    pub fn new(engine_path: impl Into<PathBuf>, timeout: Duration) -> Result<Self> {
        let engine_path = engine_path.into();
        if engine_path.as_os_str().is_empty() {
            return Err(SliceError::configuration("engine path is empty"));
        }
        if engine_path.components().count() > 1 && !engine_path.exists() {
            return Err(SliceError::configuration(format!(
                "engine not found at {}",
                engine_path.display()
            )));
        }
        Ok(Self {
            engine_path,
            timeout,
        })
    }

    pub fn from_config(config: &SlicerConfig) -> Result<Self> {
        let path = config.require_engine_path()?;
        Self::new(path, config.engine_timeout())
    }

    pub fn engine_path(&self) -> &Path {
        &self.engine_path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `engine_path` with `args`, bounded by `timeout`
    pub async fn execute(&self, args: &[OsString], timeout: Duration) -> Result<EngineOutcome> {
        let mut command = Command::new(&self.engine_path);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|e| {
            SliceError::from(EngineFailure::Spawn {
                reason: format!("{}: {}", self.engine_path.display(), e),
            })
        })?;
        let mut group = ProcessGroup::new(child.id());

        tracing::info!(
            engine = %self.engine_path.display(),
            args = args.len(),
            pid = ?child.id(),
            "Engine started"
        );

        let stdout = tokio::spawn(read_pipe(child.stdout.take()));
        let stderr = tokio::spawn(read_pipe(child.stderr.take()));

        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                stdout.abort();
                stderr.abort();
                return Err(EngineFailure::Spawn {
                    reason: format!("failed to wait for engine: {}", e),
                }
                .into());
            }
            Err(_) => {
                group.kill();
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "Failed to kill timed-out engine");
                }
                stdout.abort();
                stderr.abort();
                tracing::error!(timeout_ms = timeout.as_millis() as u64, "Engine timed out");
                return Ok(EngineOutcome::TimedOut { timeout });
            }
        };

        // Leftover children would hold the pipes open
        group.kill();
        let stdout = stdout.await.unwrap_or_default();
        let stderr = stderr.await.unwrap_or_default();

        if status.success() {
            tracing::info!("Engine finished");
            Ok(EngineOutcome::Success { stdout, stderr })
        } else {
            tracing::warn!(exit_code = ?status.code(), "Engine exited with failure");
            Ok(EngineOutcome::Failed {
                exit_code: status.code(),
                stdout,
                stderr,
            })
        }
    }
}

#[async_trait]
impl SlicingEngine for EngineInvoker {
    async fn run(&self, args: &[OsString]) -> Result<EngineOutcome> {
        self.execute(args, self.timeout).await
    }
}

/// The engine's process group, killed on [`kill`](Self::kill) or drop
#[derive(Debug)]
struct ProcessGroup {
    pgid: Option<u32>,
}

impl ProcessGroup {
    /// The group led by `pid`; the engine is spawned as its own group leader
    fn new(pid: Option<u32>) -> Self {
        Self { pgid: pid }
    }

    /// Send SIGKILL to every process in the group, once
    fn kill(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        #[cfg(unix)]
        {
            let Ok(pgid) = libc::pid_t::try_from(pgid) else {
                return;
            };
            // SAFETY: killpg takes no pointers; it only signals the group.
            if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
                let err = std::io::Error::last_os_error();
                if err.raw_os_error() != Some(libc::ESRCH) {
                    tracing::warn!(pgid, error = %err, "Failed to kill engine process group");
                }
            } else {
                tracing::debug!(pgid, "Killed engine process group");
            }
        }
        #[cfg(not(unix))]
        let _ = pgid;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            tracing::debug!(error = %e, "Failed to read engine output");
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
