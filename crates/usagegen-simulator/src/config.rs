//! Configuration for a generation run.
//!
//! Every key is optional; the defaults reproduce the classic seeding run:
//! one month of 5-minute ticks for 10,000 branches spread over 1,000
//! workspaces, written to a `metrics` table that keeps one day at full
//! resolution and hourly averages beyond that.

use crate::error::ConfigError;
use crate::walk::WalkParams;
use crate::window::TimeWindow;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rand::rngs::{OsRng, StdRng};
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use usagegen_core::{parse_duration, Timestamp};
use usagegen_storage::{RollupFunction, TableSchema};

/// Main configuration for the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// First tick (inclusive), RFC 3339 or "YYYY-MM-DD HH:MM:SS" in UTC
    pub start: String,

    /// End of the window (exclusive)
    pub end: String,

    /// Tick interval (e.g. "5m")
    pub step: String,

    /// Number of workspaces to generate
    pub workspace_count: usize,

    /// Number of branches to generate
    pub branch_count: usize,

    /// Usage drift parameters
    pub walk: WalkParams,

    /// Seed for the random source; entropy when absent
    pub seed: Option<u64>,

    /// Where batches are committed
    pub sink: SinkSettings,

    /// Target table definition
    pub table: TableSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            start: "2023-03-01 00:00:00".to_string(),
            end: "2023-04-01 00:00:00".to_string(),
            step: "5m".to_string(),
            workspace_count: 1000,
            branch_count: 10000,
            walk: WalkParams::default(),
            seed: None,
            sink: SinkSettings::default(),
            table: TableSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Which sink receives the batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// In-process columnar table
    Memory,
    /// Line protocol over HTTP
    Http,
}

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkKind::Memory => write!(f, "memory"),
            SinkKind::Http => write!(f, "http"),
        }
    }
}

/// Sink settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkSettings {
    pub kind: SinkKind,
    /// Server URL for the HTTP sink (e.g., "http://localhost:8086")
    pub server_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            kind: SinkKind::Memory,
            server_url: "http://localhost:8086".to_string(),
            timeout_secs: 30,
        }
    }
}

impl SinkSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Target table settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    /// Table (measurement) name
    pub name: String,
    /// Full-resolution retention (e.g., "1d")
    pub ttl: String,
    /// Rollup bucket width (e.g., "1h")
    pub bucket: String,
    /// Rollup function for expired buckets
    pub rollup: RollupFunction,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            name: "metrics".to_string(),
            ttl: "1d".to_string(),
            bucket: "1h".to_string(),
            rollup: RollupFunction::Avg,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl GeneratorConfig {
    /// Load a YAML configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the file if it exists, otherwise use the defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn time_window(&self) -> Result<TimeWindow, ConfigError> {
        let start = parse_instant(&self.start)?;
        let end = parse_instant(&self.end)?;
        let step = parse_duration(&self.step)
            .map_err(|source| ConfigError::InvalidDuration { key: "step", source })?;
        TimeWindow::new(start, end, step)
    }

    pub fn table_schema(&self) -> Result<TableSchema, ConfigError> {
        let ttl = parse_duration(&self.table.ttl)
            .map_err(|source| ConfigError::InvalidDuration { key: "table.ttl", source })?;
        let bucket = parse_duration(&self.table.bucket)
            .map_err(|source| ConfigError::InvalidDuration { key: "table.bucket", source })?;

        let schema = TableSchema::new(&self.table.name, ttl, bucket, self.table.rollup);
        schema
            .validate()
            .map_err(|e| ConfigError::InvalidTable(e.to_string()))?;
        Ok(schema)
    }

    /// The run's random source, seeded from `seed` or the OS
    pub fn rng(&self) -> Result<StdRng, ConfigError> {
        match self.seed {
            Some(seed) => Ok(StdRng::seed_from_u64(seed)),
            None => StdRng::from_rng(OsRng).map_err(ConfigError::RandomSource),
        }
    }

    /// Check everything a run needs before touching the sink
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.time_window()?;
        self.table_schema()?;
        self.walk.validate()?;
        if self.workspace_count == 0 && self.branch_count > 0 {
            return Err(ConfigError::NoWorkspaces {
                branches: self.branch_count,
            });
        }
        Ok(())
    }
}

/// Parse an instant as RFC 3339, or as a naive UTC date-time in
/// `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DDTHH:MM:SS` form.
pub fn parse_instant(s: &str) -> Result<Timestamp, ConfigError> {
    let s = s.trim();
    let datetime = DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
        .map_err(|_| ConfigError::InvalidInstant(s.to_string()))?;

    datetime
        .timestamp_nanos_opt()
        .ok_or_else(|| ConfigError::InvalidInstant(s.to_string()))
}

/// Format a timestamp as RFC 3339 (UTC)
pub fn format_instant(ts: Timestamp) -> String {
    Utc.timestamp_nanos(ts).to_rfc3339()
}
