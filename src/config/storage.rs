//! StorageConfig and resolve_paths for the node store and file content root.

use crate::config::xdg;
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_STORE_PATH: &str = ".arbor/store";
const DEFAULT_FILE_ROOT: &str = ".arbor/files";

fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

fn default_file_root() -> PathBuf {
    PathBuf::from(DEFAULT_FILE_ROOT)
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the node record store (relative to workspace root)
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Directory holding attachment content (relative to workspace root)
    #[serde(default = "default_file_root")]
    pub file_root: PathBuf,
}

impl StorageConfig {
    /// Resolve storage paths to actual filesystem locations.
    ///
    /// Default values live under the workspace's XDG data directory; anything
    /// else is taken relative to the workspace root.
    pub fn resolve_paths(&self, workspace_root: &Path) -> Result<(PathBuf, PathBuf), ApiError> {
        let store_path = if self.store_path == default_store_path() {
            xdg::workspace_data_dir(workspace_root)?.join("store")
        } else {
            workspace_root.join(&self.store_path)
        };

        let file_root = if self.file_root == default_file_root() {
            xdg::workspace_data_dir(workspace_root)?.join("files")
        } else {
            workspace_root.join(&self.file_root)
        };

        Ok((store_path, file_root))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            file_root: default_file_root(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_paths_are_workspace_relative() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            store_path: PathBuf::from("db"),
            file_root: PathBuf::from("content"),
        };
        let (store, files) = config.resolve_paths(dir.path()).unwrap();
        assert_eq!(store, dir.path().join("db"));
        assert_eq!(files, dir.path().join("content"));
    }

    #[test]
    fn absolute_paths_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            store_path: dir.path().join("db"),
            file_root: dir.path().join("content"),
        };
        let (store, _) = config.resolve_paths(Path::new("/unused")).unwrap();
        assert_eq!(store, dir.path().join("db"));
    }
}
