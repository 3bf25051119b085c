//! Slicing request settings.

use crate::constants::{ALL_PLATES_SENTINEL, CONTAINER_EXTENSION, DEFAULT_PLATE, TOOLPATH_EXTENSION};
use crate::error::{Result, SliceError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Output format requested from the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExportFormat {
    /// Native toolpath files, one per plate
    #[default]
    #[serde(rename = "gcode")]
    Gcode,
    /// Packaged project container
    #[serde(rename = "3mf")]
    ThreeMf,
}

impl ExportFormat {
    /// File extension (without the dot) of artifacts in this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gcode => TOOLPATH_EXTENSION,
            Self::ThreeMf => CONTAINER_EXTENSION,
        }
    }

    /// Whether `file_name` carries this format's extension, ignoring case
    pub fn matches(&self, file_name: &str) -> bool {
        has_extension(file_name, self.extension())
    }

    /// Detect the format of an artifact from its file name
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        [Self::Gcode, Self::ThreeMf]
            .into_iter()
            .find(|format| format.matches(file_name))
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = SliceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gcode" => Ok(Self::Gcode),
            "3mf" => Ok(Self::ThreeMf),
            other => Err(SliceError::validation(format!(
                "unknown export format '{}'",
                other
            ))),
        }
    }
}

fn has_extension(file_name: &str, extension: &str) -> bool {
    let Some((_, ext)) = file_name.rsplit_once('.') else {
        return false;
    };
    ext.eq_ignore_ascii_case(extension)
}

/// Which plate(s) of the model to slice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlateSelector {
    /// Let the engine slice its default (first) plate
    #[default]
    Default,
    /// Slice every plate
    All,
    /// Slice one plate, 1-based
    Index(u32),
}

impl PlateSelector {
    /// Value of the engine's slice-target flag
    pub fn slice_arg(&self) -> String {
        match self {
            Self::Default => DEFAULT_PLATE.to_string(),
            Self::All => ALL_PLATES_SENTINEL.to_string(),
            Self::Index(index) => index.to_string(),
        }
    }
}

impl std::fmt::Display for PlateSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::All => write!(f, "all"),
            Self::Index(index) => write!(f, "{}", index),
        }
    }
}

impl FromStr for PlateSelector {
    type Err = SliceError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<u32>()
            .map(Self::Index)
            .map_err(|_| SliceError::validation(format!("invalid plate selector '{}'", s)))
    }
}

/// Settings of a single slicing job
///
/// Profile names are opaque identifiers. They are resolved to files by the
/// profile store before the engine runs; this type only checks their shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SliceSettings {
    /// Printer profile name
    pub printer: Option<String>,
    /// Process preset profile name
    pub preset: Option<String>,
    /// Filament profile name
    pub filament: Option<String>,
    /// Build plate surface type
    pub bed_type: Option<String>,
    /// Plate(s) to slice
    pub plate: PlateSelector,
    /// Auto-arrange; `None` keeps the engine default
    pub arrange: Option<bool>,
    /// Auto-orient; `None` keeps the engine default
    pub orient: Option<bool>,
    /// Allow several filaments on a single plate
    pub multicolor_one_plate: bool,
    /// Requested output format
    pub export_format: ExportFormat,
}

impl SliceSettings {
    /// Create empty settings (engine defaults everywhere)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_printer(mut self, name: impl Into<String>) -> Self {
        self.printer = Some(name.into());
        self
    }

    pub fn with_preset(mut self, name: impl Into<String>) -> Self {
        self.preset = Some(name.into());
        self
    }

    pub fn with_filament(mut self, name: impl Into<String>) -> Self {
        self.filament = Some(name.into());
        self
    }

    pub fn with_bed_type(mut self, bed_type: impl Into<String>) -> Self {
        self.bed_type = Some(bed_type.into());
        self
    }

    pub fn with_plate(mut self, plate: PlateSelector) -> Self {
        self.plate = plate;
        self
    }

    pub fn with_arrange(mut self, arrange: bool) -> Self {
        self.arrange = Some(arrange);
        self
    }

    pub fn with_orient(mut self, orient: bool) -> Self {
        self.orient = Some(orient);
        self
    }

    pub fn with_multicolor_one_plate(mut self, enabled: bool) -> Self {
        self.multicolor_one_plate = enabled;
        self
    }

    pub fn with_export_format(mut self, format: ExportFormat) -> Self {
        self.export_format = format;
        self
    }

    /// Reject malformed settings before any workspace exists
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("printer", &self.printer),
            ("preset", &self.preset),
            ("filament", &self.filament),
        ] {
            if let Some(name) = value {
                validate_profile_reference(field, name)?;
            }
        }

        if let Some(bed_type) = &self.bed_type {
            if bed_type.trim().is_empty() {
                return Err(SliceError::validation("bed type cannot be empty"));
            }
        }

        if self.plate == PlateSelector::Index(0) {
            return Err(SliceError::validation(
                "plate index is 1-based; use 'all' to slice every plate",
            ));
        }

        Ok(())
    }
}

/// Names of newly stored profiles are restricted to ASCII letters and digits
pub fn validate_profile_name(field: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(SliceError::validation(format!("{} name cannot be empty", field)));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(SliceError::validation(format!(
            "{} name '{}' must only contain letters and numbers",
            field, name
        )));
    }
    Ok(())
}

/// Check a name that refers to an existing profile
///
/// Stored profiles may carry any file stem (`Bambu_X1C-0.4`), so lookups only
/// refuse names that could leave the profile directory or break the engine's
/// `;`-separated file lists.
pub fn validate_profile_reference(field: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(SliceError::validation(format!("{} name cannot be empty", field)));
    }
    if name == "." || name == ".." || name.contains(['/', '\\', '\0', ';']) {
        return Err(SliceError::validation(format!(
            "{} name '{}' is not a valid profile name",
            field, name
        )));
    }
    Ok(())
}
