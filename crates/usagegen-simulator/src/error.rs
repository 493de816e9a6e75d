//! Error types for the generator

use std::path::PathBuf;
use thiserror::Error;
use usagegen_core::{CoreError, SinkError, Timestamp};

/// Invalid run configuration, detected before any data is generated
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid instant {0:?}: expected RFC 3339 or \"YYYY-MM-DD HH:MM:SS\"")]
    InvalidInstant(String),

    #[error("Invalid duration for `{key}`: {source}")]
    InvalidDuration {
        key: &'static str,
        #[source]
        source: CoreError,
    },

    #[error("Step must be positive, got {0}ns")]
    NonPositiveStep(i64),

    #[error("Cannot assign {branches} branches to an empty workspace set")]
    NoWorkspaces { branches: usize },

    #[error("Branch {0} is assigned more than once")]
    DuplicateBranch(String),

    #[error("Invalid walk parameter: {0}")]
    InvalidWalk(String),

    #[error("Failed to seed the random source: {0}")]
    RandomSource(#[source] rand::Error),

    #[error("Invalid table definition: {0}")]
    InvalidTable(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Fatal errors of a generation run.
///
/// Nothing is retried: the first error aborts the run and re-running from
/// scratch (the sink drops and recreates its table) is the recovery path.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sink initialization failed: {0}")]
    Initialization(#[source] SinkError),

    #[error("Ingestion failed for batch at {time}: {source}")]
    Ingestion {
        time: Timestamp,
        #[source]
        source: SinkError,
    },
}

/// Result type for generator operations
pub type Result<T> = std::result::Result<T, GenerateError>;
