//! Per-job workspaces
//!
//! Every job gets its own `{root}/input` and `{root}/output` tree under a
//! uniquely named directory. The [`Workspace`] value is the release guard:
//! the tree is removed exactly once, either by [`Workspace::release`] or
//! when the value is dropped, whichever happens first. Moving the workspace
//! into a response stream defers removal until the stream is finished.

use slicekit_core::constants::WORKSPACE_PREFIX;
use slicekit_core::{Result, SliceError};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const INPUT_DIR: &str = "input";
const OUTPUT_DIR: &str = "output";

/// Creates workspaces under a parent directory
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    parent: PathBuf,
}

impl WorkspaceManager {
    pub fn new(parent: impl Into<PathBuf>) -> Self {
        Self {
            parent: parent.into(),
        }
    }

    pub fn parent(&self) -> &Path {
        &self.parent
    }

    /// Create a fresh, uniquely named workspace
    pub fn acquire(&self) -> Result<Workspace> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(&self.parent)
            .map_err(|e| SliceError::resource("create workspace", e))?;

        let root = dir.path().to_path_buf();
        let input = root.join(INPUT_DIR);
        let output = root.join(OUTPUT_DIR);

        // On failure `dir` is dropped here and removes the partial tree
        for sub in [&input, &output] {
            std::fs::create_dir_all(sub)
                .map_err(|e| SliceError::resource("create workspace", e))?;
        }

        tracing::debug!(workspace = %root.display(), "Workspace created");
        Ok(Workspace {
            dir: Some(dir),
            root,
            input,
            output,
        })
    }
}

/// An exclusively owned job directory, removed when released or dropped
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    root: PathBuf,
    input: PathBuf,
    output: PathBuf,
}

impl Workspace {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn input_dir(&self) -> &Path {
        &self.input
    }

    pub fn output_dir(&self) -> &Path {
        &self.output
    }

    /// Store the uploaded model under `input/` and return its path
    ///
    /// Only the final component of `file_name` is used.
    pub fn write_input(&self, file_name: &str, contents: &[u8]) -> Result<PathBuf> {
        let name = sanitize_file_name(file_name)?;
        let path = self.input.join(name);
        std::fs::write(&path, contents)
            .map_err(|e| SliceError::resource("write model file", e))?;
        Ok(path)
    }

    /// Remove the workspace tree now
    ///
    /// Failures are logged, never returned: a teardown problem must not
    /// replace the job's own outcome.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        match dir.close() {
            Ok(()) => tracing::debug!(workspace = %self.root.display(), "Workspace released"),
            Err(e) => tracing::warn!(
                workspace = %self.root.display(),
                error = %e,
                "Failed to remove workspace"
            ),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.release_inner();
    }
}

/// Reduce a caller-supplied file name to a bare, non-empty file name
pub fn sanitize_file_name(file_name: &str) -> Result<&str> {
    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        return Err(SliceError::validation(format!(
            "invalid model file name '{}'",
            file_name
        )));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_creates_layout() {
        let parent = TempDir::new().unwrap();
        let manager = WorkspaceManager::new(parent.path());

        let workspace = manager.acquire().unwrap();
        assert!(workspace.input_dir().is_dir());
        assert!(workspace.output_dir().is_dir());
        assert!(workspace.root().starts_with(parent.path()));
        assert!(workspace
            .root()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("slice-"));
    }

    #[test]
    fn test_release_removes_tree() {
        let parent = TempDir::new().unwrap();
        let workspace = WorkspaceManager::new(parent.path()).acquire().unwrap();
        let root = workspace.root().to_path_buf();
        workspace.write_input("model.stl", b"solid x").unwrap();

        workspace.release();
        assert!(!root.exists());
    }

    #[test]
    fn test_drop_removes_tree() {
        let parent = TempDir::new().unwrap();
        let root = {
            let workspace = WorkspaceManager::new(parent.path()).acquire().unwrap();
            workspace.root().to_path_buf()
        };
        assert!(!root.exists());
    }

    #[test]
    fn test_release_after_external_removal_does_not_panic() {
        let parent = TempDir::new().unwrap();
        let workspace = WorkspaceManager::new(parent.path()).acquire().unwrap();
        std::fs::remove_dir_all(workspace.root()).unwrap();
        workspace.release();
    }

    #[test]
    fn test_acquire_fails_for_missing_parent() {
        let parent = TempDir::new().unwrap();
        let manager = WorkspaceManager::new(parent.path().join("does-not-exist"));
        let err = manager.acquire().unwrap_err();
        assert!(matches!(err, SliceError::Resource { .. }));
    }

    #[test]
    fn test_roots_are_unique() {
        let parent = TempDir::new().unwrap();
        let manager = WorkspaceManager::new(parent.path());
        let workspaces: Vec<_> = (0..16).map(|_| manager.acquire().unwrap()).collect();
        let roots: HashSet<_> = workspaces.iter().map(|w| w.root().to_path_buf()).collect();
        assert_eq!(roots.len(), 16);
    }

    #[test]
    fn test_write_input_strips_directories() {
        let parent = TempDir::new().unwrap();
        let workspace = WorkspaceManager::new(parent.path()).acquire().unwrap();

        let path = workspace.write_input("../../etc/benchy.3mf", b"PK").unwrap();
        assert_eq!(path, workspace.input_dir().join("benchy.3mf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"PK");
    }

    #[test]
    fn test_sanitize_rejects_empty_names() {
        assert!(sanitize_file_name("").is_err());
        assert!(sanitize_file_name("models/").is_err());
        assert!(sanitize_file_name("..").is_err());
        assert_eq!(sanitize_file_name("C:\\models\\cube.stl").unwrap(), "cube.stl");
    }
}
