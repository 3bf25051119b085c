//! SliceKit Engine
//!
//! Runs slicing jobs against an external slicer executable: each job gets an
//! isolated workspace, the engine is invoked with arguments derived from the
//! job's settings, and the produced artifacts are collected, measured and
//! packaged for delivery.
//!
//! - [`workspace`]: per-job directories with guaranteed teardown
//! - [`engine`]: argument construction, process invocation, failure classification
//! - [`output`]: artifact collection, metadata extraction, packaging
//! - [`pipeline`]: the ordered job pipeline
//! - [`health`]: engine and data directory probe

pub mod engine;
pub mod health;
pub mod output;
pub mod pipeline;
pub mod workspace;

pub use engine::{build_args, EngineInvoker, EngineOutcome, SlicingEngine};
pub use health::{check_health, HealthReport, HealthStatus};
pub use output::{PackagedResult, ResultPackager, ResultStream};
pub use pipeline::{SliceJob, SliceRequest, SlicingPipeline};
pub use workspace::{Workspace, WorkspaceManager};
