use crate::error::ProfileError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProfileCategory {
    Printers,
    Presets,
    Filaments,
}

impl ProfileCategory {
    pub const ALL: [ProfileCategory; 3] = [Self::Printers, Self::Presets, Self::Filaments];

    /// Directory name under the store's base path
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Printers => "printers",
            Self::Presets => "presets",
            Self::Filaments => "filaments",
        }
    }
}

impl std::fmt::Display for ProfileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

impl FromStr for ProfileCategory {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.dir_name() == s)
            .ok_or_else(|| ProfileError::InvalidCategory(s.to_string()))
    }
}

/// Profile files backing one slicing job
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedProfiles {
    pub printer: Option<PathBuf>,
    pub preset: Option<PathBuf>,
    pub filament: Option<PathBuf>,
}
