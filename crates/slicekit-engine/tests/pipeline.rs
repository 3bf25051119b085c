use async_trait::async_trait;
use serde_json::json;
use slicekit_core::{EngineFailure, ExportFormat, PlateSelector, SliceError, SliceSettings};
use slicekit_engine::{EngineOutcome, SliceRequest, SlicingEngine, SlicingPipeline};
use slicekit_profiles::ProfileCategory;
use slicekit_settings::SlicerConfig;
use std::collections::HashSet;
use std::ffi::OsString;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use zip::ZipArchive;

const PLATE_1: &str = "; HEADER_BLOCK_START\n\
; total estimated time: 1d 2h 3m 4s\n\
G28\n\
G1 X10 Y10\n\
; filament used [mm] = 4120.36\n\
; filament used [g] = 12.5\n";

const PLATE_2: &str = "; total estimated time: 10m\n\
G28\n\
; filament used [mm] = 100\n\
; filament used [g] = 0.5\n";

/// In-process engine writing canned files into the requested output directory
struct FakeEngine {
    files: Vec<(String, String)>,
    outcome: EngineOutcome,
    report: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    seen_args: Mutex<Vec<Vec<OsString>>>,
}

impl FakeEngine {
    fn producing(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(name, body)| (name.to_string(), body.to_string()))
                .collect(),
            outcome: EngineOutcome::Success {
                stdout: String::new(),
                stderr: String::new(),
            },
            report: None,
            delay: None,
            calls: AtomicUsize::new(0),
            seen_args: Mutex::new(Vec::new()),
        }
    }

    fn failing(exit_code: i32, stderr: &str, report: Option<&str>) -> Self {
        Self {
            outcome: EngineOutcome::Failed {
                exit_code: Some(exit_code),
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
            report: report.map(str::to_string),
            ..Self::producing(&[])
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_args(&self) -> Vec<String> {
        self.seen_args
            .lock()
            .unwrap()
            .last()
            .map(|args| args.iter().map(|a| a.to_string_lossy().into_owned()).collect())
            .unwrap_or_default()
    }
}

fn output_dir(args: &[OsString]) -> PathBuf {
    let pos = args
        .iter()
        .position(|a| a == "--outputdir")
        .expect("--outputdir missing");
    PathBuf::from(&args[pos + 1])
}

#[async_trait]
impl SlicingEngine for FakeEngine {
    async fn run(&self, args: &[OsString]) -> slicekit_core::Result<EngineOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_args.lock().unwrap().push(args.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let out = output_dir(args);
        for (name, body) in &self.files {
            std::fs::write(out.join(name), body).unwrap();
        }
        if let Some(report) = &self.report {
            std::fs::write(out.join("result.json"), report).unwrap();
        }
        Ok(self.outcome.clone())
    }
}

struct Fixture {
    _root: TempDir,
    data: PathBuf,
    workspaces: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let data = root.path().join("data");
        let workspaces = root.path().join("work");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::create_dir_all(&workspaces).unwrap();
        Self {
            _root: root,
            data,
            workspaces,
        }
    }

    fn config(&self) -> SlicerConfig {
        SlicerConfig {
            data_path: self.data.clone(),
            workspace_root: Some(self.workspaces.clone()),
            ..SlicerConfig::default()
        }
    }

    fn pipeline(&self, engine: &Arc<FakeEngine>) -> SlicingPipeline {
        SlicingPipeline::with_engine(&self.config(), engine.clone())
    }

    fn workspace_count(&self) -> usize {
        std::fs::read_dir(&self.workspaces).unwrap().count()
    }
}

fn request(settings: SliceSettings) -> SliceRequest {
    SliceRequest::new("cube.stl", b"solid cube\nendsolid cube\n".to_vec(), settings)
}

fn zip_entries(bytes: Vec<u8>) -> Vec<(String, String)> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut body = String::new();
            entry.read_to_string(&mut body).unwrap();
            (entry.name().to_string(), body)
        })
        .collect()
}

#[tokio::test]
async fn test_single_artifact_delivered_directly() {
    let fixture = Fixture::new();
    let engine = Arc::new(FakeEngine::producing(&[("plate_1.gcode", PLATE_1)]));
    let pipeline = fixture.pipeline(&engine);

    let job = pipeline
        .slice(request(SliceSettings::new()).with_metadata(true))
        .await
        .unwrap();

    assert_eq!(job.result().len(), 1);
    assert!(job.result().is_contained());
    let metadata = *job.metadata().unwrap();
    assert_eq!(metadata.print_time, 93784);
    assert_eq!(metadata.filament_used_g, 12.5);

    let mut out = Vec::new();
    let file_name = job.deliver_to(&mut out).unwrap();
    assert_eq!(file_name, "plate_1.gcode");
    assert_eq!(out, PLATE_1.as_bytes());
    assert_eq!(fixture.workspace_count(), 0);
}

#[tokio::test]
async fn test_multiple_artifacts_archived() {
    let fixture = Fixture::new();
    let engine = Arc::new(FakeEngine::producing(&[
        ("plate_1.gcode", PLATE_1),
        ("plate_2.gcode", PLATE_2),
    ]));
    let pipeline = fixture.pipeline(&engine);

    let settings = SliceSettings::new().with_plate(PlateSelector::All);
    let job = pipeline.slice(request(settings).with_metadata(true)).await.unwrap();

    let metadata = *job.metadata().unwrap();
    assert_eq!(metadata.print_time, 93784 + 600);
    assert!((metadata.filament_used_g - 13.0).abs() < 1e-9);
    assert!((metadata.filament_used_mm - 4220.36).abs() < 1e-9);

    let order: Vec<String> = job
        .result()
        .artifacts()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();

    let mut out = Vec::new();
    assert_eq!(job.deliver_to(&mut out).unwrap(), "result.zip");

    let entries = zip_entries(out);
    let names: Vec<String> = entries.iter().map(|(name, _)| name.clone()).collect();
    assert_eq!(names, order);
    assert!(entries.contains(&("plate_2.gcode".to_string(), PLATE_2.to_string())));
    assert_eq!(fixture.workspace_count(), 0);
}

#[tokio::test]
async fn test_container_export_ignores_other_files() {
    let fixture = Fixture::new();
    let engine = Arc::new(FakeEngine::producing(&[
        ("result.3mf", "not really a zip"),
        ("plate_1.gcode", PLATE_1),
    ]));
    let pipeline = fixture.pipeline(&engine);

    let settings = SliceSettings::new().with_export_format(ExportFormat::ThreeMf);
    let job = pipeline.slice(request(settings)).await.unwrap();

    assert!(job.metadata().is_none());
    let packaged = job.package().unwrap();
    assert_eq!(packaged.file_name(), "result.3mf");
    assert_eq!(engine.last_args()[..2], ["--export-3mf", "result.3mf"]);
    job.release();
    assert_eq!(fixture.workspace_count(), 0);
}

#[tokio::test]
async fn test_unreadable_metadata_degrades_to_zero() {
    let fixture = Fixture::new();
    let engine = Arc::new(FakeEngine::producing(&[("result.3mf", "not really a zip")]));
    let pipeline = fixture.pipeline(&engine);

    let settings = SliceSettings::new().with_export_format(ExportFormat::ThreeMf);
    let job = pipeline
        .slice(request(settings).with_metadata(true))
        .await
        .unwrap();

    assert!(job.metadata().unwrap().is_zero());
}

#[tokio::test]
async fn test_no_artifacts_is_failure() {
    let fixture = Fixture::new();
    let engine = Arc::new(FakeEngine::producing(&[("plate_1.3mf", "wrong format")]));
    let pipeline = fixture.pipeline(&engine);

    let err = pipeline.slice(request(SliceSettings::new())).await.unwrap_err();
    assert_eq!(
        err,
        SliceError::NoArtifacts {
            format: ExportFormat::Gcode
        }
    );
    assert!(err.is_engine_failure());
    assert_eq!(fixture.workspace_count(), 0);
}

#[tokio::test]
async fn test_reported_engine_failure() {
    let fixture = Fixture::new();
    let report = json!({"error_string": "Nothing to be sliced", "return_code": -100}).to_string();
    let engine = Arc::new(FakeEngine::failing(1, "noise", Some(&report)));
    let pipeline = fixture.pipeline(&engine);

    let err = pipeline.slice(request(SliceSettings::new())).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Slicing failed with error from slicer: Nothing to be sliced"
    );
    assert_eq!(fixture.workspace_count(), 0);
}

#[tokio::test]
async fn test_unstructured_engine_failure() {
    let fixture = Fixture::new();
    let engine = Arc::new(FakeEngine::failing(139, "segmentation fault", None));
    let pipeline = fixture.pipeline(&engine);

    let err = pipeline.slice(request(SliceSettings::new())).await.unwrap_err();
    match err {
        SliceError::Engine(EngineFailure::Unstructured {
            exit_code, output, ..
        }) => {
            assert_eq!(exit_code, Some(139));
            assert_eq!(output, "segmentation fault");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fixture.workspace_count(), 0);
}

#[tokio::test]
async fn test_timeout_is_reported() {
    let fixture = Fixture::new();
    let engine = Arc::new(FakeEngine {
        outcome: EngineOutcome::TimedOut {
            timeout: Duration::from_secs(600),
        },
        ..FakeEngine::producing(&[("plate_1.gcode", PLATE_1)])
    });
    let pipeline = fixture.pipeline(&engine);

    let err = pipeline.slice(request(SliceSettings::new())).await.unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(fixture.workspace_count(), 0);
}

#[tokio::test]
async fn test_invalid_settings_rejected_before_workspace() {
    let fixture = Fixture::new();
    let engine = Arc::new(FakeEngine::producing(&[("plate_1.gcode", PLATE_1)]));
    let pipeline = fixture.pipeline(&engine);

    for settings in [
        SliceSettings::new().with_printer("../etc/passwd"),
        SliceSettings::new().with_plate(PlateSelector::Index(0)),
        SliceSettings::new().with_bed_type("  "),
        SliceSettings::new().with_filament("Missing"),
    ] {
        let err = pipeline.slice(request(settings)).await.unwrap_err();
        assert!(err.is_client_error(), "expected validation error, got {err:?}");
    }

    assert_eq!(engine.calls(), 0);
    assert_eq!(fixture.workspace_count(), 0);
}

#[tokio::test]
async fn test_invalid_file_name_leaves_no_workspace() {
    let fixture = Fixture::new();
    let engine = Arc::new(FakeEngine::producing(&[("plate_1.gcode", PLATE_1)]));
    let pipeline = fixture.pipeline(&engine);

    let err = pipeline
        .slice(SliceRequest::new("uploads/..", Vec::new(), SliceSettings::new()))
        .await
        .unwrap_err();
    assert!(err.is_client_error());
    assert_eq!(engine.calls(), 0);
    assert_eq!(fixture.workspace_count(), 0);
}

#[tokio::test]
async fn test_profiles_passed_to_engine() {
    let fixture = Fixture::new();
    let engine = Arc::new(FakeEngine::producing(&[("plate_1.gcode", PLATE_1)]));
    let pipeline = fixture.pipeline(&engine);

    let store = pipeline.profiles();
    let printer = store
        .save(ProfileCategory::Printers, "X1C", &json!({"name": "X1C"}))
        .unwrap();
    let preset = store
        .save(ProfileCategory::Presets, "standard", &json!({"layer_height": "0.2"}))
        .unwrap();
    let filament = store
        .save(ProfileCategory::Filaments, "PLA", &json!({"filament_type": ["PLA"]}))
        .unwrap();

    let settings = SliceSettings::new()
        .with_printer("X1C")
        .with_preset("standard")
        .with_filament("PLA")
        .with_bed_type("Textured PEI Plate");
    let job = pipeline.slice(request(settings)).await.unwrap();

    let args = engine.last_args();
    let combined = format!("{};{}", printer.display(), preset.display());
    let pos = args.iter().position(|a| a == "--load-settings").unwrap();
    assert_eq!(args[pos + 1], combined);
    let pos = args.iter().position(|a| a == "--load-filaments").unwrap();
    assert_eq!(args[pos + 1], filament.display().to_string());

    let input = Path::new(args.last().unwrap());
    assert_eq!(input.file_name().unwrap(), "cube.stl");
    assert!(input.starts_with(job.result().workspace_root()));
    job.release();
}

#[tokio::test]
async fn test_listed_profile_names_can_be_sliced() {
    let fixture = Fixture::new();
    let engine = Arc::new(FakeEngine::producing(&[("plate_1.gcode", PLATE_1)]));
    let pipeline = fixture.pipeline(&engine);

    let filaments = pipeline.profiles().category_dir(ProfileCategory::Filaments);
    std::fs::create_dir_all(&filaments).unwrap();
    std::fs::write(filaments.join("Bambu_PLA-Basic.json"), "{}").unwrap();
    let listed = pipeline.profiles().list(ProfileCategory::Filaments).unwrap();
    assert_eq!(listed, vec!["Bambu_PLA-Basic"]);

    let settings = SliceSettings::new().with_filament(listed[0].clone());
    let job = pipeline.slice(request(settings)).await.unwrap();

    let args = engine.last_args();
    let pos = args.iter().position(|a| a == "--load-filaments").unwrap();
    assert_eq!(
        args[pos + 1],
        filaments.join("Bambu_PLA-Basic.json").display().to_string()
    );
    job.release();
}

#[tokio::test]
async fn test_cancelled_slice_releases_workspace() {
    let fixture = Fixture::new();
    let engine = Arc::new(FakeEngine {
        delay: Some(Duration::from_secs(30)),
        ..FakeEngine::producing(&[("plate_1.gcode", PLATE_1)])
    });
    let pipeline = fixture.pipeline(&engine);

    let cancelled = tokio::time::timeout(
        Duration::from_millis(200),
        pipeline.slice(request(SliceSettings::new())),
    )
    .await;

    assert!(cancelled.is_err());
    assert_eq!(engine.calls(), 1);
    assert_eq!(fixture.workspace_count(), 0);
}

#[tokio::test]
async fn test_stream_releases_workspace_when_complete() {
    let fixture = Fixture::new();
    let engine = Arc::new(FakeEngine::producing(&[
        ("plate_1.gcode", PLATE_1),
        ("plate_2.gcode", PLATE_2),
    ]));
    let pipeline = fixture.pipeline(&engine);

    let job = pipeline.slice(request(SliceSettings::new())).await.unwrap();
    let stream = job.into_stream().unwrap();
    assert_eq!(stream.file_name(), "result.zip");
    assert_eq!(stream.content_type(), "application/zip");

    let mut out: Vec<u8> = Vec::new();
    let written = stream.copy_to(&mut out).await.unwrap();
    assert_eq!(written as usize, out.len());
    assert_eq!(zip_entries(out).len(), 2);
    assert_eq!(fixture.workspace_count(), 0);
}

#[tokio::test]
async fn test_abandoned_stream_still_releases_workspace() {
    let fixture = Fixture::new();
    let large = "G1 X1 Y1 E0.01\n".repeat(200_000);
    let engine = Arc::new(FakeEngine::producing(&[("plate_1.gcode", large.as_str())]));
    let pipeline = fixture.pipeline(&engine);

    let job = pipeline.slice(request(SliceSettings::new())).await.unwrap();
    let mut stream = job.into_stream().unwrap();
    let first = stream.next_chunk().await.unwrap().unwrap();
    assert!(!first.is_empty());

    stream.finish().await;
    assert_eq!(fixture.workspace_count(), 0);
}

#[tokio::test]
async fn test_dropping_job_releases_workspace() {
    let fixture = Fixture::new();
    let engine = Arc::new(FakeEngine::producing(&[("plate_1.gcode", PLATE_1)]));
    let pipeline = fixture.pipeline(&engine);

    let job = pipeline.slice(request(SliceSettings::new())).await.unwrap();
    let root = job.result().workspace_root().to_path_buf();
    assert!(root.exists());

    drop(job);
    assert!(!root.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_jobs_use_distinct_workspaces() {
    let fixture = Fixture::new();
    let engine = Arc::new(FakeEngine::producing(&[("plate_1.gcode", PLATE_1)]));
    let pipeline = fixture.pipeline(&engine);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.slice(request(SliceSettings::new())).await })
        })
        .collect();

    let mut jobs = Vec::new();
    for handle in handles {
        jobs.push(handle.await.unwrap().unwrap());
    }

    let roots: HashSet<PathBuf> = jobs
        .iter()
        .map(|job| job.result().workspace_root().to_path_buf())
        .collect();
    assert_eq!(roots.len(), 8);
    assert_eq!(engine.calls(), 8);

    drop(jobs);
    assert_eq!(fixture.workspace_count(), 0);
}
