//! Runtime configuration for the slicing service
//!
//! A [`SlicerConfig`] is built once at process start, from defaults, an
//! optional JSON or TOML file, and environment overrides, then passed by
//! reference into the pipeline. No pipeline stage reads the environment.

use crate::error::{ConfigError, SettingsError, SettingsResult};
use serde::{Deserialize, Serialize};
use slicekit_core::SliceError;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Path of the slicing engine executable
pub const ENV_ENGINE_PATH: &str = "ORCASLICER_PATH";
/// Base directory of the profile store
pub const ENV_DATA_PATH: &str = "DATA_PATH";
/// Engine wall-clock limit in seconds
pub const ENV_TIMEOUT_SECS: &str = "SLICE_TIMEOUT_SECS";
/// Parent directory for job workspaces
pub const ENV_WORKSPACE_ROOT: &str = "SLICE_WORKSPACE_ROOT";

const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 600;
const DEFAULT_HEALTH_PROBE_TIMEOUT_SECS: u64 = 5;

/// Complete runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlicerConfig {
    /// Slicing engine executable; slicing is refused while unset
    pub engine_path: Option<PathBuf>,
    /// Base directory holding `printers/`, `presets/` and `filaments/`
    pub data_path: PathBuf,
    /// Wall-clock limit for one engine run
    pub engine_timeout_secs: u64,
    /// Where workspaces are created (system temp dir when unset)
    pub workspace_root: Option<PathBuf>,
    /// Wall-clock limit for the health probe's `--help` run
    pub health_probe_timeout_secs: u64,
}

impl Default for SlicerConfig {
    fn default() -> Self {
        Self {
            engine_path: None,
            data_path: default_data_path(),
            engine_timeout_secs: DEFAULT_ENGINE_TIMEOUT_SECS,
            workspace_root: None,
            health_probe_timeout_secs: DEFAULT_HEALTH_PROBE_TIMEOUT_SECS,
        }
    }
}

fn default_data_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("data")
}

/// Conventional location of the user's config file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("slicekit").join("config.toml"))
}

impl SlicerConfig {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> SettingsResult<Self> {
        let mut config = Self::default();
        config.merge_env()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn merge_env(&mut self) -> SettingsResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key/value source
    ///
    /// Empty values are treated as unset.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> SettingsResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(path) = get(ENV_ENGINE_PATH) {
            self.engine_path = Some(PathBuf::from(path));
        }
        if let Some(path) = get(ENV_DATA_PATH) {
            self.data_path = PathBuf::from(path);
        }
        if let Some(path) = get(ENV_WORKSPACE_ROOT) {
            self.workspace_root = Some(PathBuf::from(path));
        }
        if let Some(secs) = get(ENV_TIMEOUT_SECS) {
            self.engine_timeout_secs =
                secs.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidEnvValue {
                        var: ENV_TIMEOUT_SECS.to_string(),
                        value: secs.clone(),
                    })?;
        }

        self.validate()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("{}: {}", path.display(), e))
        })?;

        let config: Self = match extension(path) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            _ => return Err(unsupported_format(path).into()),
        };

        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded slicer config");
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match extension(path) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => toml::to_string_pretty(self)?,
            _ => return Err(unsupported_format(path).into()),
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content).map_err(|e| {
            SettingsError::SaveError(format!("{}: {}", path.display(), e))
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        if self.engine_timeout_secs == 0 {
            return Err(ConfigError::ValueOutOfRange {
                key: "engine_timeout_secs".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        if self.health_probe_timeout_secs == 0 {
            return Err(ConfigError::ValueOutOfRange {
                key: "health_probe_timeout_secs".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        Ok(())
    }

    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_timeout_secs)
    }

    pub fn health_probe_timeout(&self) -> Duration {
        Duration::from_secs(self.health_probe_timeout_secs)
    }

    /// The engine path, or a configuration error when it is unset
    pub fn require_engine_path(&self) -> Result<&Path, SliceError> {
        match &self.engine_path {
            Some(path) if !path.as_os_str().is_empty() => Ok(path.as_path()),
            _ => Err(SliceError::configuration(format!(
                "{} environment variable is not defined",
                ENV_ENGINE_PATH
            ))),
        }
    }

    /// Directory under which workspaces are created
    pub fn workspace_parent(&self) -> PathBuf {
        self.workspace_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

fn unsupported_format(path: &Path) -> ConfigError {
    ConfigError::UnsupportedFormat(
        extension(path).unwrap_or("<none>").to_string(),
    )
}
