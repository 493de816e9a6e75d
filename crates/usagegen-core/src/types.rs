//! Core data types shared by the generator and the sinks

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// Nanosecond-precision Unix epoch timestamp
pub type Timestamp = i64;

/// Identifier of a workspace (the parent entity)
pub type WorkspaceId = String;

/// Identifier of a branch (the leaf entity whose usage is tracked)
pub type BranchId = String;

/// A single usage observation.
///
/// Field order matches the column order every sink writes:
/// `time, workspace_id, branch_id, value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricRow {
    /// Timestamp in nanoseconds since Unix epoch
    pub time: Timestamp,
    pub workspace_id: WorkspaceId,
    pub branch_id: BranchId,
    /// Usage value, never negative
    pub value: u64,
}

impl MetricRow {
    /// Create a new row
    pub fn new(
        time: Timestamp,
        workspace_id: impl Into<WorkspaceId>,
        branch_id: impl Into<BranchId>,
        value: u64,
    ) -> Self {
        Self {
            time,
            workspace_id: workspace_id.into(),
            branch_id: branch_id.into(),
            value,
        }
    }

    /// Validate the row against the `UInt32` value column and non-empty ids
    pub fn validate(&self) -> Result<()> {
        if self.workspace_id.is_empty() {
            return Err(CoreError::EmptyWorkspaceId);
        }
        if self.branch_id.is_empty() {
            return Err(CoreError::EmptyBranchId);
        }
        self.value_u32()?;
        Ok(())
    }

    /// The value narrowed to the width of the storage column
    pub fn value_u32(&self) -> Result<u32> {
        u32::try_from(self.value).map_err(|_| CoreError::ValueOutOfRange(self.value))
    }
}

/// Time range for queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start timestamp (inclusive)
    pub start: Timestamp,
    /// End timestamp (exclusive)
    pub end: Timestamp,
}

impl TimeRange {
    /// Create a new time range
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// Check if a timestamp falls within this range
    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Get the duration of this range in nanoseconds
    pub fn duration_nanos(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self {
            start: i64::MIN,
            end: i64::MAX,
        }
    }
}

/// Floor `ts` to the start of its bucket. `bucket` must be positive.
/// Buckets that begin before `i64::MIN` start at `i64::MIN`.
pub fn bucket_start(ts: Timestamp, bucket: i64) -> Timestamp {
    ts.saturating_sub(ts.rem_euclid(bucket))
}
