//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::ArborConfig;
use crate::error::ApiError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from files and environment, then validate it.
    pub fn load(workspace_root: &Path) -> Result<ArborConfig, ApiError> {
        let config = MergeService::load(workspace_root)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<ArborConfig, ApiError> {
        let config = MergeService::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Create default configuration.
    pub fn default() -> ArborConfig {
        ArborConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[hierarchy]\nmax_depth = 64\n\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.hierarchy.max_depth, 64);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.pack.pack_limits, 25);
    }

    #[test]
    fn workspace_file_is_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("arbor.toml"), "[pack]\npack_limits = 7\n").unwrap();

        let config = ConfigLoader::load(dir.path()).unwrap();
        assert_eq!(config.pack.pack_limits, 7);
    }

    #[test]
    fn invalid_values_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[pack]\npack_limits = 0\n").unwrap();

        assert!(matches!(
            ConfigLoader::load_from_file(&path),
            Err(ApiError::ConfigError(_))
        ));
    }
}
