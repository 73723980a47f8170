//! Error types for the core crate.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur during layer resolution and value assembly.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("No such cluster: {0}")]
    NoSuchCluster(String),

    #[error("No such environment: {0}")]
    NoSuchEnvironment(String),

    #[error("Not a strata project: {0}")]
    NotAProject(PathBuf),

    #[error("Unknown merge policy: {0}")]
    UnknownMergePolicy(String),

    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Invalid override '{0}': expected key=value")]
    InvalidOverride(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
