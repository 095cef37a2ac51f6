//! Error types for swarmslam

use thiserror::Error;

/// swarmslam errors
#[derive(Debug, Error)]
pub enum SwarmError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported config format '{0}' (expected .yaml, .yml, .toml or .json)")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for swarmslam operations
pub type SwarmResult<T> = Result<T, SwarmError>;
