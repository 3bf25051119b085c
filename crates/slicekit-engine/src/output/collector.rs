//! Selects the artifacts of a finished engine run

use slicekit_core::{ExportFormat, Result, SliceError};
use std::path::{Path, PathBuf};

/// Files in `output_dir` matching the requested format, in listing order
///
/// An empty list is not an error here; the caller decides how to report it.
pub fn collect(output_dir: &Path, format: ExportFormat) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(output_dir)
        .map_err(|e| SliceError::resource("list engine output", e))?;

    let mut artifacts = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SliceError::resource("list engine output", e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !format.matches(name) {
            continue;
        }
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            artifacts.push(entry.path());
        }
    }

    tracing::info!(artifacts = artifacts.len(), %format, "Collected engine output");
    Ok(artifacts)
}
