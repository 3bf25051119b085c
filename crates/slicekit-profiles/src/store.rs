//! File-backed profile store
//!
//! Profiles are plain JSON documents at `{base}/{category}/{name}.json`.
//! The slicing pipeline only reads them; creation happens through
//! [`ProfileStore::save`].

use crate::error::{ProfileError, ProfileResult};
use crate::model::{ProfileCategory, ResolvedProfiles};
use serde_json::Value;
use slicekit_core::data::{validate_profile_name, validate_profile_reference};
use slicekit_core::{SliceError, SliceSettings};
use std::path::{Path, PathBuf};

const PROFILE_EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct ProfileStore {
    base_path: PathBuf,
}

impl ProfileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn category_dir(&self, category: ProfileCategory) -> PathBuf {
        self.base_path.join(category.dir_name())
    }

    /// Location of a profile, whether or not it exists
    pub fn path_for(&self, category: ProfileCategory, name: &str) -> PathBuf {
        self.category_dir(category)
            .join(format!("{}.{}", name, PROFILE_EXTENSION))
    }

    pub fn exists(&self, category: ProfileCategory, name: &str) -> bool {
        validate_reference(name).is_ok() && self.path_for(category, name).is_file()
    }

    /// Sorted names of all profiles in a category
    pub fn list(&self, category: ProfileCategory) -> ProfileResult<Vec<String>> {
        let dir = self.category_dir(category);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if !path.extension().is_some_and(|ext| ext == PROFILE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Read a profile document by any name [`list`](Self::list) reports
    pub fn get(&self, category: ProfileCategory, name: &str) -> ProfileResult<Value> {
        validate_reference(name)?;
        let path = self.path_for(category, name);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(not_found(category, name));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// Write a profile document, replacing any existing one
    pub fn save(&self, category: ProfileCategory, name: &str, document: &Value) -> ProfileResult<PathBuf> {
        validate_name(name)?;

        let dir = self.category_dir(category);
        std::fs::create_dir_all(&dir)?;

        let path = self.path_for(category, name);
        std::fs::write(&path, serde_json::to_string_pretty(document)?)?;
        tracing::info!(%category, name, "Saved profile");
        Ok(path)
    }

    /// Parse uploaded bytes as JSON, then save them
    pub fn save_bytes(&self, category: ProfileCategory, name: &str, bytes: &[u8]) -> ProfileResult<PathBuf> {
        let document: Value = serde_json::from_slice(bytes)
            .map_err(|e| ProfileError::InvalidDocument(e.to_string()))?;
        self.save(category, name, &document)
    }

    /// Map the settings' profile names to existing profile files
    pub fn resolve(&self, settings: &SliceSettings) -> Result<ResolvedProfiles, SliceError> {
        let lookup = |category: ProfileCategory, name: &Option<String>| -> Result<Option<PathBuf>, SliceError> {
            match name {
                None => Ok(None),
                Some(name) => {
                    validate_reference(name)?;
                    let path = self.path_for(category, name);
                    if path.is_file() {
                        Ok(Some(path))
                    } else {
                        Err(not_found(category, name).into())
                    }
                }
            }
        };

        Ok(ResolvedProfiles {
            printer: lookup(ProfileCategory::Printers, &settings.printer)?,
            preset: lookup(ProfileCategory::Presets, &settings.preset)?,
            filament: lookup(ProfileCategory::Filaments, &settings.filament)?,
        })
    }
}

/// Rule for names of new profiles
fn validate_name(name: &str) -> ProfileResult<()> {
    validate_profile_name("profile", name).map_err(|_| ProfileError::InvalidName(name.to_string()))
}

/// Rule for names of existing profiles
fn validate_reference(name: &str) -> ProfileResult<()> {
    validate_profile_reference("profile", name)
        .map_err(|_| ProfileError::InvalidName(name.to_string()))
}

fn not_found(category: ProfileCategory, name: &str) -> ProfileError {
    ProfileError::NotFound {
        category: category.to_string(),
        name: name.to_string(),
    }
}
