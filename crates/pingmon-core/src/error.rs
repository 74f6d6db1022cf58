//! Error types for configuration loading.

use thiserror::Error;

/// Errors that can occur while loading or validating the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid duration {0:?} (expected e.g. \"30s\", \"500ms\", \"1m\")")]
    InvalidDuration(String),

    #[error("no host groups configured")]
    NoGroups,

    #[error("group {0:?} has no hosts")]
    EmptyGroup(String),

    #[error("duplicate area id {0:?}")]
    DuplicateArea(String),

    #[error("duplicate host address {0:?}")]
    DuplicateAddress(String),
}
