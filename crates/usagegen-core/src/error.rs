//! Error types for usagegen-core

use thiserror::Error;

/// Core error types
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Empty workspace id")]
    EmptyWorkspaceId,

    #[error("Empty branch id")]
    EmptyBranchId,

    #[error("Value {0} does not fit the UInt32 value column")]
    ValueOutOfRange(u64),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors a sink reports back to the generator.
///
/// The variants follow the lifecycle of a run: `Schema` during setup,
/// `Connection` when a batch cannot be opened, `Encoding` when a row is
/// rejected on append and `Ingestion` when a commit fails.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Ingestion error: {0}")]
    Ingestion(String),
}

/// Result type alias for sink operations
pub type SinkResult<T> = std::result::Result<T, SinkError>;

impl From<CoreError> for SinkError {
    fn from(e: CoreError) -> Self {
        SinkError::Encoding(e.to_string())
    }
}
