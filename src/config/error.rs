use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to determine configuration directory")]
    ConfigDirResolution,

    #[error("Failed to create configuration directory '{0}'")]
    ConfigDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to read configuration file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to write configuration file '{0}'")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse configuration file '{0}'")]
    Parse(PathBuf, #[source] serde_json::Error),

    #[error("Failed to encode configuration")]
    Encode(#[source] serde_json::Error),

    #[error("No API key configured, set AMBIENT_API_KEY or add api_key to the configuration file")]
    MissingApiKey,

    #[error("Invalid configuration value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}
