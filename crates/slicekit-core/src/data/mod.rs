//! Data model of a slicing job.
//!
//! - [`SliceSettings`]: what the caller asked for
//! - [`SliceResult`]: which artifacts the engine produced, and where
//! - [`SliceMetaData`]: print time and filament usage recovered from them

pub mod metadata;
pub mod result;
pub mod settings;

pub use metadata::SliceMetaData;
pub use result::SliceResult;
pub use settings::{
    validate_profile_name, validate_profile_reference, ExportFormat, PlateSelector, SliceSettings,
};
