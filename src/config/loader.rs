//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::RotationConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Default event log file name, placed in the user's home directory.
pub const DEFAULT_LOG_FILE_NAME: &str = ".identity-rotator.log";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load a configuration from a TOML file without validating it.
///
/// CLI overrides are applied on top before validation, see [`finalize`].
pub fn load_config(path: &Path) -> Result<RotationConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Resolve defaults that depend on the environment and validate.
pub fn finalize(mut config: RotationConfig) -> Result<RotationConfig, ConfigError> {
    if config.log_file.is_none() {
        config.log_file = default_log_file();
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// `<home>/.identity-rotator.log`, or `None` if no home directory is known.
pub fn default_log_file() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(DEFAULT_LOG_FILE_NAME))
}
