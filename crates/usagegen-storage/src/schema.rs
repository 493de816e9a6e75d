//! Table definitions

use crate::error::{Result, StorageError};
use serde::{Deserialize, Serialize};
use usagegen_core::duration::{NANOS_PER_DAY, NANOS_PER_HOUR};
use usagegen_core::parse_duration;

/// How expired rows of one bucket are folded into a single row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollupFunction {
    /// Mean of the values, truncated to an integer
    Avg,
    Min,
    Max,
    /// Sum, saturating at the column's maximum
    Sum,
    /// Value of the earliest row
    First,
    /// Value of the latest row
    Last,
}

impl RollupFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RollupFunction::Avg => "avg",
            RollupFunction::Min => "min",
            RollupFunction::Max => "max",
            RollupFunction::Sum => "sum",
            RollupFunction::First => "first",
            RollupFunction::Last => "last",
        }
    }
}

impl std::str::FromStr for RollupFunction {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "avg" | "mean" => Ok(RollupFunction::Avg),
            "min" => Ok(RollupFunction::Min),
            "max" => Ok(RollupFunction::Max),
            "sum" => Ok(RollupFunction::Sum),
            "first" => Ok(RollupFunction::First),
            "last" => Ok(RollupFunction::Last),
            other => Err(StorageError::InvalidSchema(format!(
                "unknown rollup function: {}",
                other
            ))),
        }
    }
}

/// Definition of a metrics table.
///
/// Rows are keyed by `(workspace_id, branch_id, bucket(time), time)`. Once
/// every instant of a bucket is older than `ttl` relative to the newest
/// committed row, the bucket's rows per (workspace, branch) are replaced by
/// one row computed with `rollup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name
    pub name: String,
    /// Retention before rollup, in nanoseconds
    pub ttl: i64,
    /// Rollup bucket width, in nanoseconds
    pub bucket: i64,
    /// Rollup function applied to `value`
    pub rollup: RollupFunction,
}

impl TableSchema {
    /// Create a schema with the given TTL and bucket
    pub fn new(name: &str, ttl: i64, bucket: i64, rollup: RollupFunction) -> Self {
        Self {
            name: name.to_string(),
            ttl,
            bucket,
            rollup,
        }
    }

    /// Create from duration strings (e.g. `"1d"`, `"1h"`)
    pub fn with_duration_strs(name: &str, ttl: &str, bucket: &str, rollup: RollupFunction) -> Result<Self> {
        let ttl = parse_duration(ttl).map_err(|e| StorageError::InvalidSchema(e.to_string()))?;
        let bucket =
            parse_duration(bucket).map_err(|e| StorageError::InvalidSchema(e.to_string()))?;
        Ok(Self::new(name, ttl, bucket, rollup))
    }

    /// Column names in write order
    pub fn columns(&self) -> [&'static str; 4] {
        ["time", "workspace_id", "branch_id", "value"]
    }

    /// Validate the schema
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(StorageError::InvalidSchema("Empty table name".to_string()));
        }
        if self.ttl <= 0 {
            return Err(StorageError::InvalidSchema("TTL must be positive".to_string()));
        }
        if self.bucket <= 0 {
            return Err(StorageError::InvalidSchema("Bucket must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for TableSchema {
    fn default() -> Self {
        Self::new("metrics", NANOS_PER_DAY, NANOS_PER_HOUR, RollupFunction::Avg)
    }
}
