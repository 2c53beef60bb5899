//! Error types for config loading and credential storage.

use thiserror::Error;

/// Errors returned while loading config or accessing credentials.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading a config file failed.
    #[error("failed to read config: {0}")]
    ReadFailed(#[from] std::io::Error),
    /// Parsing a config file failed.
    #[error("failed to parse config: {0}")]
    ParseFailed(#[from] json5::Error),
    /// Converting JSON values failed.
    #[error("failed to decode config: {0}")]
    DecodeFailed(#[from] serde_json::Error),
    /// Generic validation failure.
    #[error("invalid config: {0}")]
    Invalid(String),
}
