//! Print-time and filament-usage extraction
//!
//! Toolpath files announce their estimated duration near the top
//! (`; total estimated time: 1d 2h 3m 4s`) and their filament usage in the
//! closing comment block (`; filament used [g] = 12.5`). The duration is
//! found by a forward scan; filament usage by a bounded scan over the last
//! [`TRAILER_SCAN_LINES`] lines. Containers are zip archives whose toolpath
//! entries are summed.
//!
//! Extraction is best-effort: unreadable or malformed input yields zeroes.

use regex::Regex;
use slicekit_core::{ExportFormat, SliceMetaData};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::ZipArchive;

/// Lines at the end of a toolpath searched for filament annotations
pub const TRAILER_SCAN_LINES: usize = 10;

/// Initial tail read for the trailer scan; doubled until it holds
/// [`TRAILER_SCAN_LINES`] whole lines
const TRAILER_SCAN_BYTES: u64 = 64 * 1024;

/// Largest tail read for the trailer scan. Trailers with longer lines are
/// scanned over the lines that fit.
const MAX_TRAILER_SCAN_BYTES: u64 = 16 * 1024 * 1024;

/// Upper bound on the buffer reserved up front for a container entry
const MAX_ENTRY_PREALLOC: u64 = 16 * 1024 * 1024;

const FILAMENT_G_PREFIX: &str = "; filament used [g]";
const FILAMENT_MM_PREFIX: &str = "; filament used [mm]";

/// Why metadata could not be read; logged, never returned to callers
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Not a toolpath or container: {0}")]
    UnsupportedArtifact(PathBuf),
}

fn time_regex() -> &'static Regex {
    static TIME_REGEX: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    TIME_REGEX.get_or_init(|| {
        Regex::new(
            r"(?i)total estimated time:\s*(?:(\d+)d\s*)?(?:(\d+)h\s*)?(?:(\d+)m\s*)?(?:(\d+)s)?",
        )
        .expect("invalid regex pattern")
    })
}

fn number_regex() -> &'static Regex {
    static NUMBER_REGEX: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    NUMBER_REGEX.get_or_init(|| Regex::new(r"\d+(\.\d+)?").expect("invalid regex pattern"))
}

/// Parse metadata out of toolpath text
pub fn parse_toolpath(content: &str) -> SliceMetaData {
    let print_time = content.lines().find_map(parse_print_time).unwrap_or(0);
    let (filament_used_g, filament_used_mm) = scan_trailer(content);

    SliceMetaData {
        print_time,
        filament_used_g,
        filament_used_mm,
    }
}

/// Duration in seconds if `line` carries the estimated-time annotation
fn parse_print_time(line: &str) -> Option<u64> {
    let caps = time_regex().captures(line)?;
    let component = |index: usize| -> u64 {
        caps.get(index)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };

    let seconds = component(1)
        .saturating_mul(86_400)
        .saturating_add(component(2).saturating_mul(3_600))
        .saturating_add(component(3).saturating_mul(60))
        .saturating_add(component(4));
    Some(seconds)
}

/// Filament grams and millimeters from the last lines of `content`
///
/// When an annotation appears more than once inside the window, the
/// occurrence nearest the top of the window is kept.
fn scan_trailer(content: &str) -> (f64, f64) {
    let mut grams = 0.0;
    let mut millimeters = 0.0;

    for line in content.rsplit('\n').take(TRAILER_SCAN_LINES) {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        if line.starts_with(FILAMENT_G_PREFIX) {
            grams = first_number(line);
        }
        if line.starts_with(FILAMENT_MM_PREFIX) {
            millimeters = first_number(line);
        }
    }

    (grams, millimeters)
}

fn first_number(line: &str) -> f64 {
    number_regex()
        .find(line)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0)
}

/// Metadata of one artifact; zero on any failure
pub fn extract(path: &Path) -> SliceMetaData {
    match try_extract(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to extract slice metadata");
            SliceMetaData::default()
        }
    }
}

/// Summed metadata of several artifacts
pub fn extract_all<P: AsRef<Path>>(paths: &[P]) -> SliceMetaData {
    paths.iter().map(|p| extract(p.as_ref())).sum()
}

/// Metadata of one artifact, reporting why it could not be read
pub fn try_extract(path: &Path) -> Result<SliceMetaData, MetadataError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match ExportFormat::from_file_name(&name) {
        Some(ExportFormat::Gcode) => extract_toolpath_file(path),
        Some(ExportFormat::ThreeMf) => extract_container(path),
        None => Err(MetadataError::UnsupportedArtifact(path.to_path_buf())),
    }
}

/// Scan a toolpath file without loading it whole
fn extract_toolpath_file(path: &Path) -> Result<SliceMetaData, MetadataError> {
    let mut reader = BufReader::new(File::open(path)?);

    let mut print_time = None;
    let mut line = Vec::new();
    while print_time.is_none() {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        print_time = parse_print_time(&String::from_utf8_lossy(&line));
    }

    let (start, tail) = read_trailer(&mut reader)?;
    let tail = String::from_utf8_lossy(&tail);
    // Drop the partial first line when the window starts mid-file
    let tail = match (start > 0, tail.find('\n')) {
        (true, Some(pos)) => &tail[pos + 1..],
        _ => &tail[..],
    };
    let (filament_used_g, filament_used_mm) = scan_trailer(tail);

    Ok(SliceMetaData {
        print_time: print_time.unwrap_or(0),
        filament_used_g,
        filament_used_mm,
    })
}

/// Read the end of the file, widening the window until it covers the last
/// [`TRAILER_SCAN_LINES`] lines in full
///
/// Returns the window's start offset and its bytes.
fn read_trailer<R: Read + Seek>(reader: &mut R) -> std::io::Result<(u64, Vec<u8>)> {
    let len = reader.seek(SeekFrom::End(0))?;
    let mut window = TRAILER_SCAN_BYTES;

    loop {
        let start = len.saturating_sub(window);
        reader.seek(SeekFrom::Start(start))?;
        let mut tail = Vec::with_capacity((len - start) as usize);
        reader.read_to_end(&mut tail)?;

        let newlines = tail.iter().filter(|&&b| b == b'\n').count();
        if start == 0 || newlines >= TRAILER_SCAN_LINES || window >= MAX_TRAILER_SCAN_BYTES {
            return Ok((start, tail));
        }
        window = (window * 2).min(MAX_TRAILER_SCAN_BYTES);
    }
}

/// Sum metadata over every toolpath entry of a container
fn extract_container(path: &Path) -> Result<SliceMetaData, MetadataError> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut total = SliceMetaData::default();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if !entry.is_file() || !ExportFormat::Gcode.matches(entry.name()) {
            continue;
        }

        let mut bytes = Vec::with_capacity(entry.size().min(MAX_ENTRY_PREALLOC) as usize);
        entry.read_to_end(&mut bytes)?;
        let metadata = parse_toolpath(&String::from_utf8_lossy(&bytes));
        tracing::debug!(entry = entry.name(), ?metadata, "Parsed container entry");
        total += metadata;
    }

    Ok(total)
}
