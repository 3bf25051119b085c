//! # SliceKit
//!
//! Slicing job orchestration around an external slicer engine: uploaded
//! models are sliced in isolated per-job workspaces, and the produced
//! toolpaths or project containers are collected, measured and packaged.
//!
//! ## Architecture
//!
//! SliceKit is organized as a workspace with multiple crates:
//!
//! 1. **slicekit-core** - Settings, results, metadata, error taxonomy, constants
//! 2. **slicekit-settings** - Runtime configuration from files and the environment
//! 3. **slicekit-profiles** - Printer, preset and filament profile storage
//! 4. **slicekit-engine** - Workspaces, engine invocation, collection, packaging
//! 5. **slicekit** - Command-line front end that integrates all crates

pub use slicekit_core::{
    EngineFailure, ExportFormat, PlateSelector, Result, SliceError, SliceMetaData, SliceResult,
    SliceSettings,
};

pub use slicekit_engine::{
    check_health, EngineInvoker, HealthReport, HealthStatus, PackagedResult, ResultStream,
    SliceJob, SliceRequest, SlicingPipeline,
};

pub use slicekit_profiles::{ProfileCategory, ProfileError, ProfileStore};

pub use slicekit_settings::{default_config_path, SettingsError, SlicerConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Log output style
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, multi-line
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Initialize logging
///
/// Sets up structured logging with:
/// - RUST_LOG environment variable support (default level INFO)
/// - Output on stderr, leaving stdout for command results
/// - Pretty or JSON formatting
pub fn init_logging(format: LogFormat) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(tracing::Level::INFO.as_str()));

    match format {
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .pretty();

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .json()
                .with_current_span(true)
                .with_span_list(false);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
    }

    Ok(())
}
