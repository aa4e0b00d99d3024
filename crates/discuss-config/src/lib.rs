//! Discuss sync configuration.
//!
//! TOML-based configuration with environment overrides and validation.
//! All sections use defaults so partial configs work out of the box.

pub mod env;
pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    DiscussConfig, LogLevel, LoggingConfig, RealtimeConfig, TopicsConfig, CONFIG_SCHEMA_VERSION,
};

use discuss_common::ConfigError;
use std::path::Path;

/// Load config from the platform default path, apply environment
/// overrides and validate the result.
pub fn load_config() -> Result<DiscussConfig, ConfigError> {
    let mut config = toml_loader::load_default()?;
    env::apply_env_overrides(&mut config);
    validation::validate(&config)?;
    Ok(config)
}

/// Same as [`load_config`] for an explicit file.
pub fn load_config_from(path: &Path) -> Result<DiscussConfig, ConfigError> {
    let mut config = toml_loader::load_from_path(path)?;
    env::apply_env_overrides(&mut config);
    validation::validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_schema_version_is_1() {
        assert_eq!(CONFIG_SCHEMA_VERSION, 1);
    }

    #[test]
    fn load_config_from_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[topics]\nerror_queue = \"errors\"\n").unwrap();

        let result = load_config_from(&path);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
