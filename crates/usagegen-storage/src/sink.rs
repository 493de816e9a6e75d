//! MemorySink - a `Sink` backed by an in-memory `Catalog`

use crate::catalog::Catalog;
use crate::error::StorageError;
use crate::schema::TableSchema;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};
use usagegen_core::{RowBatch, Sink, SinkBatch, SinkResult};

/// Writes batches into one table of a shared catalog.
pub struct MemorySink {
    catalog: Arc<Catalog>,
    schema: TableSchema,
    closed: bool,
    /// Size of the last committed batch, used to pre-size the next one
    last_batch_len: usize,
}

impl MemorySink {
    /// Create a sink over a fresh catalog
    pub fn new(schema: TableSchema) -> Self {
        Self::with_catalog(Arc::new(Catalog::new()), schema)
    }

    /// Create a sink over an existing catalog
    pub fn with_catalog(catalog: Arc<Catalog>, schema: TableSchema) -> Self {
        Self {
            catalog,
            schema,
            closed: false,
            last_batch_len: 0,
        }
    }

    /// The catalog this sink writes into
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn ensure_open(&self) -> SinkResult<()> {
        if self.closed {
            return Err(StorageError::Closed.into_ingestion_error());
        }
        Ok(())
    }
}

#[async_trait]
impl Sink for MemorySink {
    type Batch = RowBatch;

    async fn setup(&mut self) -> SinkResult<()> {
        if self.closed {
            return Err(StorageError::Closed.into_schema_error());
        }
        self.schema
            .validate()
            .map_err(StorageError::into_schema_error)?;

        let dropped = self.catalog.drop_table(&self.schema.name);
        self.catalog
            .create_table(self.schema.clone())
            .map_err(StorageError::into_schema_error)?;

        info!(
            table = %self.schema.name,
            dropped,
            ttl_ns = self.schema.ttl,
            bucket_ns = self.schema.bucket,
            rollup = self.schema.rollup.as_str(),
            "Created table"
        );
        Ok(())
    }

    async fn open_batch(&mut self) -> SinkResult<RowBatch> {
        self.ensure_open()?;
        Ok(RowBatch::with_capacity(self.last_batch_len))
    }

    async fn commit(&mut self, batch: RowBatch) -> SinkResult<()> {
        self.ensure_open()?;

        let len = batch.len();
        let folded = self
            .catalog
            .write(&self.schema.name, |table| table.insert_batch(batch.rows()))
            .and_then(|inserted| inserted)
            .map_err(StorageError::into_ingestion_error)?;

        if folded > 0 {
            debug!(table = %self.schema.name, folded, "Applied TTL rollup");
        }
        self.last_batch_len = len;
        Ok(())
    }

    async fn teardown(&mut self) -> SinkResult<()> {
        if !self.closed {
            self.closed = true;
            debug!(table = %self.schema.name, "Memory sink closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use usagegen_core::{MetricRow, SinkError};

    #[tokio::test]
    async fn test_commit_requires_setup() {
        let mut sink = MemorySink::new(TableSchema::default());
        let mut batch = sink.open_batch().await.unwrap();
        batch.append(MetricRow::new(0, "ws", "br", 1)).unwrap();

        let err = sink.commit(batch).await.unwrap_err();
        assert!(matches!(err, SinkError::Ingestion(_)));
    }

    #[tokio::test]
    async fn test_commit_after_teardown_fails() {
        let mut sink = MemorySink::new(TableSchema::default());
        sink.setup().await.unwrap();
        sink.teardown().await.unwrap();
        // teardown is idempotent
        sink.teardown().await.unwrap();

        assert!(matches!(
            sink.open_batch().await,
            Err(SinkError::Connection(_))
        ));
        assert!(matches!(
            sink.commit(RowBatch::new()).await,
            Err(SinkError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_schema_is_schema_error() {
        let mut schema = TableSchema::default();
        schema.bucket = 0;
        let mut sink = MemorySink::new(schema);
        assert!(matches!(sink.setup().await, Err(SinkError::Schema(_))));
    }

    #[tokio::test]
    async fn test_out_of_order_commit_is_ingestion_error() {
        let mut sink = MemorySink::new(TableSchema::default());
        sink.setup().await.unwrap();

        let mut batch = sink.open_batch().await.unwrap();
        batch.append(MetricRow::new(10, "ws", "br", 1)).unwrap();
        sink.commit(batch).await.unwrap();

        let mut batch = sink.open_batch().await.unwrap();
        batch.append(MetricRow::new(5, "ws", "br", 1)).unwrap();
        assert!(matches!(
            sink.commit(batch).await,
            Err(SinkError::Ingestion(_))
        ));
    }
}
