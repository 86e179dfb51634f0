//! Error types for settings loading

use std::path::PathBuf;
use thiserror::Error;

/// Result type for settings operations
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Errors that can occur while loading server settings
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Settings or secrets file could not be read
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings or secrets file is not valid YAML for its shape
    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `!secret` names a key missing from secrets.yaml
    #[error("secret '{key}' not found in secrets.yaml")]
    SecretNotFound { key: String },

    /// `!env_var` names an unset variable
    #[error("environment variable '{var}' not set")]
    EnvVarNotFound { var: String },

    /// A value failed validation
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}
