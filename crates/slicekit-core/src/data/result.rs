//! Result of a successful engine run

use std::path::{Path, PathBuf};

/// Artifacts produced by one job, in output-directory listing order
///
/// The paths live inside the job's workspace and are only valid until the
/// workspace is released.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceResult {
    workspace_root: PathBuf,
    artifacts: Vec<PathBuf>,
}

impl SliceResult {
    pub fn new(workspace_root: impl Into<PathBuf>, artifacts: Vec<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            artifacts,
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    pub fn into_artifacts(self) -> Vec<PathBuf> {
        self.artifacts
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Every artifact lies under `{root}/output`
    pub fn is_contained(&self) -> bool {
        let output = self.workspace_root.join("output");
        self.artifacts.iter().all(|path| path.starts_with(&output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_containment() {
        let result = SliceResult::new(
            "/tmp/slice-abc",
            vec![PathBuf::from("/tmp/slice-abc/output/plate_1.gcode")],
        );
        assert!(result.is_contained());
        assert_eq!(result.len(), 1);

        let escaped = SliceResult::new(
            "/tmp/slice-abc",
            vec![PathBuf::from("/tmp/slice-abc/input/model.stl")],
        );
        assert!(!escaped.is_contained());
    }
}
