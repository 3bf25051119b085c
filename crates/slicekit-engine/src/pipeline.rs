//! The slicing job pipeline
//!
//! Stages run strictly in order: validate settings, resolve profiles,
//! acquire a workspace, store the model, build arguments, run the engine,
//! classify failures, collect artifacts, and optionally extract metadata.
//! Nothing touches the filesystem before validation and profile resolution
//! succeed. Once a workspace exists it is owned by a [`Workspace`] guard, so
//! every later exit path tears it down.

use crate::engine::{build_args, classify_failure, EngineInvoker, SlicingEngine};
use crate::output::{collect, extract_all, PackagedResult, ResultPackager, ResultStream};
use crate::workspace::{Workspace, WorkspaceManager};
use slicekit_core::{ExportFormat, Result, SliceError, SliceMetaData, SliceResult, SliceSettings};
use slicekit_profiles::ProfileStore;
use slicekit_settings::SlicerConfig;
use std::io::Write;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// One slicing request
#[derive(Debug, Clone)]
pub struct SliceRequest {
    /// Name of the uploaded model file; only its last component is used
    pub file_name: String,
    pub model: Vec<u8>,
    pub settings: SliceSettings,
    /// Parse print time and filament usage from the artifacts
    pub collect_metadata: bool,
}

impl SliceRequest {
    pub fn new(file_name: impl Into<String>, model: Vec<u8>, settings: SliceSettings) -> Self {
        Self {
            file_name: file_name.into(),
            model,
            settings,
            collect_metadata: false,
        }
    }

    pub fn with_metadata(mut self, collect: bool) -> Self {
        self.collect_metadata = collect;
        self
    }
}

/// Orchestrates slicing jobs
///
/// Holds no per-job state; any number of jobs may run concurrently, each in
/// its own workspace.
#[derive(Clone)]
pub struct SlicingPipeline {
    profiles: ProfileStore,
    workspaces: WorkspaceManager,
    engine: Arc<dyn SlicingEngine>,
}

impl SlicingPipeline {
    /// Build a pipeline running the configured engine executable
    ///
    /// Fails with a configuration error when no engine path is set.
    pub fn new(config: &SlicerConfig) -> Result<Self> {
        let invoker = EngineInvoker::from_config(config)?;
        Ok(Self::with_engine(config, Arc::new(invoker)))
    }

    /// Build a pipeline around a custom engine
    pub fn with_engine(config: &SlicerConfig, engine: Arc<dyn SlicingEngine>) -> Self {
        Self {
            profiles: ProfileStore::new(&config.data_path),
            workspaces: WorkspaceManager::new(config.workspace_parent()),
            engine,
        }
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Run one job to completion
    ///
    /// On success the returned [`SliceJob`] owns the workspace holding the
    /// artifacts; on failure the workspace is already gone.
    pub async fn slice(&self, request: SliceRequest) -> Result<SliceJob> {
        let id = Uuid::new_v4();
        let span = tracing::info_span!("slice_job", job_id = %id);
        self.run(id, request).instrument(span).await
    }

    async fn run(&self, id: Uuid, request: SliceRequest) -> Result<SliceJob> {
        let SliceRequest {
            file_name,
            model,
            settings,
            collect_metadata,
        } = request;

        settings.validate()?;
        let profiles = self.profiles.resolve(&settings)?;

        let workspace = self.workspaces.acquire()?;
        let input = workspace.write_input(&file_name, &model)?;
        drop(model);

        let args = build_args(&profiles, &settings, &input, workspace.output_dir());
        tracing::info!(
            workspace = %workspace.root().display(),
            plate = %settings.plate,
            format = %settings.export_format,
            "Slicing model"
        );

        let outcome = self.engine.run(&args).await?;
        classify_failure(outcome, workspace.output_dir())?;

        let artifacts = collect(workspace.output_dir(), settings.export_format)?;
        if artifacts.is_empty() {
            tracing::warn!("Engine succeeded without producing artifacts");
            return Err(SliceError::NoArtifacts {
                format: settings.export_format,
            });
        }

        let metadata = if collect_metadata {
            Some(extract_metadata(artifacts.clone()).await)
        } else {
            None
        };

        let result = SliceResult::new(workspace.root(), artifacts);
        tracing::info!(artifacts = result.len(), "Slicing job finished");

        Ok(SliceJob {
            id,
            format: settings.export_format,
            workspace,
            result,
            metadata,
        })
    }
}

async fn extract_metadata(artifacts: Vec<std::path::PathBuf>) -> SliceMetaData {
    match tokio::task::spawn_blocking(move || extract_all(&artifacts)).await {
        Ok(metadata) => metadata,
        Err(e) => {
            tracing::warn!(error = %e, "Metadata extraction task failed");
            SliceMetaData::default()
        }
    }
}

/// A finished job whose artifacts are still on disk
///
/// The workspace is removed when the job is delivered, released, or dropped.
#[derive(Debug)]
pub struct SliceJob {
    id: Uuid,
    format: ExportFormat,
    workspace: Workspace,
    result: SliceResult,
    metadata: Option<SliceMetaData>,
}

impl SliceJob {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn result(&self) -> &SliceResult {
        &self.result
    }

    pub fn metadata(&self) -> Option<&SliceMetaData> {
        self.metadata.as_ref()
    }

    /// Decide how the artifacts will be delivered
    pub fn package(&self) -> Result<PackagedResult> {
        ResultPackager::package(self.result.artifacts(), self.format)
    }

    /// Write the packaged result into `writer`, then release the workspace
    ///
    /// Returns the name the result should be saved under.
    pub fn deliver_to<W: Write>(self, writer: W) -> Result<String> {
        let packaged = self.package()?;
        let outcome = packaged.write_to(writer);
        self.workspace.release();
        outcome.map(|()| packaged.file_name().to_string())
    }

    /// Hand the packaged result to a background writer
    ///
    /// The workspace travels with the stream and is removed once it ends.
    pub fn into_stream(self) -> Result<ResultStream> {
        let packaged = self.package()?;
        Ok(packaged.into_stream(self.workspace))
    }

    /// Discard the artifacts now
    pub fn release(self) {
        self.workspace.release();
    }
}
