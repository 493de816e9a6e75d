//! HTTP sink writing InfluxDB line protocol.
//!
//! Every batch becomes one `POST /write` whose body holds one line per row:
//!
//! ```text
//! metrics,workspace_id=<ws>,branch_id=<br> value=<v>u <time_ns>
//! ```

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};
use usagegen_core::{MetricRow, Sink, SinkBatch, SinkError, SinkResult};

/// Totals of what the sink sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub batches: u64,
    pub points: u64,
    pub bytes: u64,
}

/// Sink that commits batches to a line-protocol HTTP endpoint.
pub struct LineProtocolSink {
    client: reqwest::Client,
    health_url: String,
    write_url: String,
    measurement: String,
    stats: WriteStats,
}

impl LineProtocolSink {
    pub fn new(server_url: &str, measurement: &str, timeout: Duration) -> SinkResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        let base = server_url.trim_end_matches('/');
        Ok(Self {
            client,
            health_url: format!("{}/health", base),
            write_url: format!("{}/write", base),
            measurement: measurement.to_string(),
            stats: WriteStats::default(),
        })
    }

    pub fn write_url(&self) -> &str {
        &self.write_url
    }

    pub fn stats(&self) -> WriteStats {
        self.stats
    }
}

#[async_trait]
impl Sink for LineProtocolSink {
    type Batch = LineBatch;

    /// The remote store owns its schema, so setup only checks that the
    /// server answers.
    async fn setup(&mut self) -> SinkResult<()> {
        let response = self
            .client
            .get(&self.health_url)
            .send()
            .await
            .map_err(|e| SinkError::Connection(format!("{}: {}", self.health_url, e)))?;

        if !response.status().is_success() {
            return Err(SinkError::Schema(format!(
                "Health check at {} returned {}",
                self.health_url,
                response.status()
            )));
        }

        info!(url = %self.write_url, measurement = %self.measurement, "Line protocol sink ready");
        Ok(())
    }

    async fn open_batch(&mut self) -> SinkResult<LineBatch> {
        Ok(LineBatch::new(&self.measurement))
    }

    async fn commit(&mut self, batch: LineBatch) -> SinkResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let points = batch.len() as u64;
        let body = batch.into_body();
        let bytes = body.len() as u64;

        let response = self
            .client
            .post(&self.write_url)
            .header("Content-Type", "text/plain")
            .body(body)
            .send()
            .await
            .map_err(|e| SinkError::Ingestion(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Ingestion(format!(
                "Server returned error: {} - {}",
                status, body
            )));
        }

        self.stats.batches += 1;
        self.stats.points += points;
        self.stats.bytes += bytes;
        Ok(())
    }

    async fn teardown(&mut self) -> SinkResult<()> {
        debug!(
            batches = self.stats.batches,
            points = self.stats.points,
            bytes = self.stats.bytes,
            "Line protocol sink closed"
        );
        Ok(())
    }
}

/// An open batch rendered as line protocol as rows are appended.
#[derive(Debug, Clone)]
pub struct LineBatch {
    measurement: String,
    body: String,
    rows: usize,
}

impl LineBatch {
    pub fn new(measurement: &str) -> Self {
        Self {
            measurement: measurement.to_string(),
            body: String::new(),
            rows: 0,
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn into_body(self) -> String {
        self.body
    }
}

impl SinkBatch for LineBatch {
    fn append(&mut self, row: MetricRow) -> SinkResult<()> {
        row.validate()?;
        if self.rows > 0 {
            self.body.push('\n');
        }
        self.body.push_str(&format_line(&self.measurement, &row));
        self.rows += 1;
        Ok(())
    }

    fn len(&self) -> usize {
        self.rows
    }
}

/// Formats one row as a line protocol point.
pub fn format_line(measurement: &str, row: &MetricRow) -> String {
    format!(
        "{},workspace_id={},branch_id={} value={}u {}",
        escape_measurement(measurement),
        escape_tag_value(&row.workspace_id),
        escape_tag_value(&row.branch_id),
        row.value,
        row.time
    )
}

/// Escapes special characters in tag values for line protocol.
pub fn escape_tag_value(value: &str) -> String {
    value
        .replace(' ', "\\ ")
        .replace(',', "\\,")
        .replace('=', "\\=")
}

fn escape_measurement(value: &str) -> String {
    value.replace(' ', "\\ ").replace(',', "\\,")
}
