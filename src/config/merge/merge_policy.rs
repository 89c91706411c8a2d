//! Merge policy: the default layer every load starts from.

use crate::config::ArborConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Builder seeded with the built-in defaults; later sources override key by key.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let defaults = ArborConfig::default();
    Config::builder()
        .set_default(
            "storage.store_path",
            defaults.storage.store_path.to_string_lossy().into_owned(),
        )?
        .set_default(
            "storage.file_root",
            defaults.storage.file_root.to_string_lossy().into_owned(),
        )?
        .set_default("hierarchy.max_depth", defaults.hierarchy.max_depth as i64)?
        .set_default("pack.pack_limits", defaults.pack.pack_limits as i64)?
        .set_default("logging.level", defaults.logging.level)?
        .set_default("logging.format", defaults.logging.format)?
        .set_default("logging.output", defaults.logging.output)
}
