//! SliceKit Settings Crate
//!
//! Runtime configuration of the slicing service: where the engine lives, where
//! profiles are stored, and how long a job may run.

pub mod config;
pub mod error;

pub use config::{default_config_path, SlicerConfig};
pub use error::{ConfigError, SettingsError, SettingsResult};
