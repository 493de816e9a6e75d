//! Storage error types

use thiserror::Error;
use usagegen_core::{SinkError, Timestamp};

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table already exists: {0}")]
    TableExists(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Out-of-order write: row at {time} is older than watermark {watermark}")]
    OutOfOrder { time: Timestamp, watermark: Timestamp },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Sink is closed")]
    Closed,
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    /// Classify a failure during setup
    pub fn into_schema_error(self) -> SinkError {
        SinkError::Schema(self.to_string())
    }

    /// Classify a failure during commit
    pub fn into_ingestion_error(self) -> SinkError {
        match self {
            StorageError::InvalidData(msg) => SinkError::Encoding(msg),
            StorageError::Closed => SinkError::Connection(self.to_string()),
            other => SinkError::Ingestion(other.to_string()),
        }
    }
}
