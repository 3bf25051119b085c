//! # SliceKit Core
//!
//! Core types, error taxonomy, and constants shared by the SliceKit crates.
//! Provides the slicing request model, the engine's result and metadata
//! records, and the flag and file-name vocabulary of the external engine.

pub mod constants;
pub mod data;
pub mod error;

pub use data::{ExportFormat, PlateSelector, SliceMetaData, SliceResult, SliceSettings};

pub use error::{EngineFailure, Result, SliceError};
