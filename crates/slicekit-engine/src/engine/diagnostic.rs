//! Engine failure classification
//!
//! On a failed run the engine may leave `result.json` in its output
//! directory. When that report carries an `error_string`, the failure is
//! structured; otherwise the captured process output is surfaced as-is.

use super::EngineOutcome;
use serde::Deserialize;
use slicekit_core::constants::DIAGNOSTIC_REPORT_FILE;
use slicekit_core::EngineFailure;
use std::path::Path;

/// Captured output kept in an unstructured failure, in bytes
const MAX_CAPTURED_OUTPUT: usize = 8 * 1024;

/// The engine's failure report
#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosticReport {
    #[serde(default)]
    pub error_string: Option<String>,
    #[serde(default)]
    pub return_code: Option<i64>,
}

impl DiagnosticReport {
    /// Read the report from an output directory, if present and parseable
    pub fn read(output_dir: &Path) -> Option<Self> {
        let path = output_dir.join(DIAGNOSTIC_REPORT_FILE);
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Unparseable diagnostic report");
                None
            }
        }
    }

    /// The report's message, if it has a non-empty one
    pub fn message(&self) -> Option<&str> {
        self.error_string
            .as_deref()
            .map(str::trim)
            .filter(|msg| !msg.is_empty())
    }
}

/// Turn an engine outcome into success or a classified failure
pub fn classify_failure(outcome: EngineOutcome, output_dir: &Path) -> Result<(), EngineFailure> {
    match outcome {
        EngineOutcome::Success { .. } => Ok(()),
        EngineOutcome::TimedOut { timeout } => Err(EngineFailure::TimedOut {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
        EngineOutcome::Failed {
            exit_code,
            stdout,
            stderr,
        } => {
            if let Some(message) = DiagnosticReport::read(output_dir)
                .as_ref()
                .and_then(DiagnosticReport::message)
            {
                return Err(EngineFailure::Reported {
                    message: message.to_string(),
                    exit_code,
                });
            }

            let output = if stderr.trim().is_empty() { stdout } else { stderr };
            Err(EngineFailure::Unstructured {
                status: describe_exit(exit_code),
                exit_code,
                output: tail(output.trim(), MAX_CAPTURED_OUTPUT),
            })
        }
    }
}

fn describe_exit(exit_code: Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// The last `max` bytes of `text`, cut on a character boundary
fn tail(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &text[start..])
}
