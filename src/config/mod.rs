//! Configuration
//!
//! Layered TOML configuration: built-in defaults, the global config file, the
//! workspace `arbor.toml`, then `ARBOR__SECTION__KEY` environment overrides.

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;
pub mod storage;

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;
pub use storage::StorageConfig;

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use crate::types::DEFAULT_MAX_DEPTH;
use serde::{Deserialize, Serialize};

/// Default upper bound on files in one archive.
pub const DEFAULT_PACK_LIMITS: usize = 25;

/// Traversal limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyConfig {
    /// Bound on ancestor-chain walks; deeper chains are treated as corrupt
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

/// Archive export limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackConfig {
    /// Maximum number of files packed into one archive
    #[serde(default = "default_pack_limits")]
    pub pack_limits: usize,
}

fn default_pack_limits() -> usize {
    DEFAULT_PACK_LIMITS
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            pack_limits: default_pack_limits(),
        }
    }
}

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArborConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub hierarchy: HierarchyConfig,

    #[serde(default)]
    pub pack: PackConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ArborConfig {
    /// Reject values no operation can work with.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.hierarchy.max_depth == 0 {
            return Err(ApiError::ConfigError(
                "hierarchy.max_depth must be greater than 0".to_string(),
            ));
        }
        if self.pack.pack_limits == 0 {
            return Err(ApiError::ConfigError(
                "pack.pack_limits must be greater than 0".to_string(),
            ));
        }
        if self.storage.store_path.as_os_str().is_empty() {
            return Err(ApiError::ConfigError(
                "storage.store_path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
