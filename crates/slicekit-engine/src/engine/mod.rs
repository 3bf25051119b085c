//! External slicing engine
//!
//! - [`args`]: settings to command-line translation
//! - [`invoker`]: process execution with a wall-clock limit
//! - [`diagnostic`]: failure classification from the engine's report file

pub mod args;
pub mod diagnostic;
pub mod invoker;

pub use args::build_args;
pub use diagnostic::{classify_failure, DiagnosticReport};
pub use invoker::EngineInvoker;

use async_trait::async_trait;
use slicekit_core::Result;
use std::ffi::OsString;
use std::time::Duration;

/// How an engine run ended
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutcome {
    /// Exit status zero; output files are left for the collector
    Success {
        stdout: String,
        stderr: String,
    },
    /// Non-zero exit or termination by signal
    Failed {
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    /// Killed after running past the deadline
    TimedOut {
        timeout: Duration,
    },
}

impl EngineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Something that can run a slicing command line
///
/// Implemented by [`EngineInvoker`] for the real executable; tests supply
/// in-process fakes.
#[async_trait]
pub trait SlicingEngine: Send + Sync {
    /// Run the engine to completion (or timeout)
    ///
    /// Errors are reserved for failures to start the process at all; every
    /// run that started is reported as an [`EngineOutcome`].
    async fn run(&self, args: &[OsString]) -> Result<EngineOutcome>;
}
