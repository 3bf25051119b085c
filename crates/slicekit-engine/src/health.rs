//! Engine and data directory health probe

use crate::engine::{EngineInvoker, EngineOutcome};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use slicekit_core::constants::flags;
use slicekit_settings::SlicerConfig;
use std::ffi::OsString;
use std::path::Path;
use std::sync::OnceLock;

static VERSION_PATTERN: OnceLock<Regex> = OnceLock::new();

fn version_pattern() -> &'static Regex {
    VERSION_PATTERN.get_or_init(|| Regex::new(r"OrcaSlicer-([\d.]+)").expect("invalid regex pattern"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineCheck {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataPathCheck {
    pub accessible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthChecks {
    pub engine: EngineCheck,
    pub data_path: DataPathCheck,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub checks: HealthChecks,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Probe the engine and the data directory
///
/// Never fails: every problem is recorded in the report instead.
pub async fn check_health(config: &SlicerConfig) -> HealthReport {
    let timestamp = Utc::now();
    let engine = check_engine(config).await;
    let data_path = check_data_path(&config.data_path);

    let status = if engine.available && data_path.accessible {
        HealthStatus::Healthy
    } else {
        HealthStatus::Unhealthy
    };

    tracing::info!(?status, "Health check completed");
    HealthReport {
        status,
        timestamp,
        checks: HealthChecks { engine, data_path },
    }
}

async fn check_engine(config: &SlicerConfig) -> EngineCheck {
    let invoker = match EngineInvoker::from_config(config) {
        Ok(invoker) => invoker,
        Err(e) => return engine_error(e.to_string()),
    };
    if let Err(reason) = check_executable(invoker.engine_path()) {
        return engine_error(reason);
    }

    let args = [OsString::from(flags::HELP)];
    match invoker.execute(&args, config.health_probe_timeout()).await {
        Ok(EngineOutcome::Success { stdout, stderr }) => EngineCheck {
            available: true,
            version: Some(
                parse_version(&stdout)
                    .or_else(|| parse_version(&stderr))
                    .unwrap_or("unknown")
                    .to_string(),
            ),
            error: None,
        },
        Ok(EngineOutcome::Failed {
            exit_code, stderr, ..
        }) => engine_error(match exit_code {
            Some(code) => format!("engine exited with code {}: {}", code, stderr.trim()),
            None => format!("engine terminated by signal: {}", stderr.trim()),
        }),
        Ok(EngineOutcome::TimedOut { timeout }) => engine_error(format!(
            "engine did not answer within {}ms",
            timeout.as_millis()
        )),
        Err(e) => engine_error(e.to_string()),
    }
}

fn engine_error(error: String) -> EngineCheck {
    EngineCheck {
        available: false,
        version: None,
        error: Some(error),
    }
}

/// Extract the engine version from its help banner
pub fn parse_version(output: &str) -> Option<&str> {
    version_pattern()
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[cfg(unix)]
fn check_executable(path: &Path) -> Result<(), String> {
    use std::os::unix::fs::PermissionsExt;

    // Bare program names are resolved through PATH when spawned
    if path.components().count() <= 1 {
        return Ok(());
    }
    let metadata = std::fs::metadata(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    if !metadata.is_file() || metadata.permissions().mode() & 0o111 == 0 {
        return Err(format!("{} is not executable", path.display()));
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_executable(_path: &Path) -> Result<(), String> {
    Ok(())
}

fn check_data_path(path: &Path) -> DataPathCheck {
    let result = std::fs::metadata(path)
        .map_err(|e| format!("{}: {}", path.display(), e))
        .and_then(|metadata| {
            if !metadata.is_dir() {
                return Err(format!("{} is not a directory", path.display()));
            }
            if metadata.permissions().readonly() {
                return Err(format!("{} is not writable", path.display()));
            }
            std::fs::read_dir(path)
                .map(|_| ())
                .map_err(|e| format!("{}: {}", path.display(), e))
        });

    match result {
        Ok(()) => DataPathCheck {
            accessible: true,
            error: None,
        },
        Err(error) => DataPathCheck {
            accessible: false,
            error: Some(error),
        },
    }
}
