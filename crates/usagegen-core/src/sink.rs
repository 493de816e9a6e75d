//! The contract between the generator and a storage backend.
//!
//! A run drives a sink through a fixed lifecycle:
//!
//! 1. `setup()` once, before any data is generated.
//! 2. For every timestamp, strictly in increasing order:
//!    `open_batch()`, one `append()` per (workspace, branch) pair, then
//!    `commit()`. The next batch is opened only after the previous commit
//!    returned.
//! 3. `teardown()` once, whether the run succeeded or not.
//!
//! Implementations may rely on the ordering in step 2: exactly one batch per
//! timestamp, committed sequentially and never concurrently.

use crate::error::SinkResult;
use crate::types::MetricRow;
use async_trait::async_trait;

/// A storage backend that accepts one batch of rows per timestamp.
#[async_trait]
pub trait Sink: Send {
    /// The open batch handle rows are appended to
    type Batch: SinkBatch;

    /// Drop the target structure if it exists, then create it.
    /// Calling it twice leaves the same state as calling it once.
    async fn setup(&mut self) -> SinkResult<()>;

    /// Open an empty batch for the next timestamp
    async fn open_batch(&mut self) -> SinkResult<Self::Batch>;

    /// Commit a batch as one unit
    async fn commit(&mut self, batch: Self::Batch) -> SinkResult<()>;

    /// Release the connection
    async fn teardown(&mut self) -> SinkResult<()>;
}

/// An open batch of rows.
pub trait SinkBatch: Send {
    /// Append a row, rejecting values the storage columns cannot hold
    fn append(&mut self, row: MetricRow) -> SinkResult<()>;

    /// Number of rows appended so far
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A plain, validated list of rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowBatch {
    rows: Vec<MetricRow>,
}

impl RowBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn rows(&self) -> &[MetricRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<MetricRow> {
        self.rows
    }
}

impl SinkBatch for RowBatch {
    fn append(&mut self, row: MetricRow) -> SinkResult<()> {
        row.validate()?;
        self.rows.push(row);
        Ok(())
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkError;

    #[test]
    fn test_row_batch_append() {
        let mut batch = RowBatch::new();
        assert!(batch.is_empty());

        batch.append(MetricRow::new(0, "ws-1", "br-1", 120)).unwrap();
        batch.append(MetricRow::new(0, "ws-1", "br-2", 90)).unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.rows()[1].branch_id, "br-2");
        assert_eq!(batch.into_rows().len(), 2);
    }

    #[test]
    fn test_row_batch_rejects_invalid_rows() {
        let mut batch = RowBatch::new();

        let err = batch
            .append(MetricRow::new(0, "ws-1", "br-1", u64::MAX))
            .unwrap_err();
        assert!(matches!(err, SinkError::Encoding(_)));

        let err = batch.append(MetricRow::new(0, "", "br-1", 1)).unwrap_err();
        assert!(matches!(err, SinkError::Encoding(_)));

        assert!(batch.is_empty());
    }
}
