//! MetricsTable - dictionary-encoded columnar storage for usage rows
//!
//! Rows land in the `raw` columns in timestamp order (the sink contract
//! guarantees one batch per timestamp, committed in order). Because raw rows
//! are time-ordered, the rows whose bucket has fully passed the TTL always
//! form a prefix of the raw columns; that prefix is folded into the `rolled`
//! columns after every insert.

use crate::error::{Result, StorageError};
use crate::schema::{RollupFunction, TableSchema};
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use usagegen_core::{bucket_start, MetricRow, TimeRange, Timestamp};

/// String dictionary backing the id columns
#[derive(Debug, Default, Clone)]
struct Dictionary {
    values: Vec<String>,
    index: FxHashMap<String, u32>,
}

impl Dictionary {
    fn intern(&mut self, s: &str) -> u32 {
        if let Some(&id) = self.index.get(s) {
            return id;
        }
        let id = self.values.len() as u32;
        self.values.push(s.to_string());
        self.index.insert(s.to_string(), id);
        id
    }

    fn lookup(&self, s: &str) -> Option<u32> {
        self.index.get(s).copied()
    }

    fn get(&self, id: u32) -> &str {
        &self.values[id as usize]
    }

    fn len(&self) -> usize {
        self.values.len()
    }
}

#[derive(Debug, Default, Clone)]
struct Columns {
    time: Vec<Timestamp>,
    workspace_id: Vec<u32>,
    branch_id: Vec<u32>,
    value: Vec<u32>,
}

impl Columns {
    fn push(&mut self, time: Timestamp, workspace_id: u32, branch_id: u32, value: u32) {
        self.time.push(time);
        self.workspace_id.push(workspace_id);
        self.branch_id.push(branch_id);
        self.value.push(value);
    }

    fn len(&self) -> usize {
        self.time.len()
    }

    fn drain_prefix(&mut self, n: usize) {
        self.time.drain(..n);
        self.workspace_id.drain(..n);
        self.branch_id.drain(..n);
        self.value.drain(..n);
    }
}

/// Running aggregate of one (workspace, branch, bucket) group
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    first_time: Timestamp,
    first_value: u32,
    last_value: u32,
    min: u32,
    max: u32,
    sum: u64,
    count: u64,
}

impl Accumulator {
    fn new(time: Timestamp, value: u32) -> Self {
        Self {
            first_time: time,
            first_value: value,
            last_value: value,
            min: value,
            max: value,
            sum: value as u64,
            count: 1,
        }
    }

    fn push(&mut self, value: u32) {
        self.last_value = value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value as u64;
        self.count += 1;
    }

    fn finish(&self, function: RollupFunction) -> u32 {
        match function {
            RollupFunction::Avg => (self.sum / self.count) as u32,
            RollupFunction::Min => self.min,
            RollupFunction::Max => self.max,
            RollupFunction::Sum => u32::try_from(self.sum).unwrap_or(u32::MAX),
            RollupFunction::First => self.first_value,
            RollupFunction::Last => self.last_value,
        }
    }
}

/// Point-in-time statistics of a table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    pub rows: usize,
    pub raw_rows: usize,
    pub rolled_up_rows: usize,
    pub workspaces: usize,
    pub branches: usize,
    pub batches: u64,
    pub watermark: Option<Timestamp>,
}

/// A metrics table with TTL-driven rollup
#[derive(Debug, Clone)]
pub struct MetricsTable {
    schema: TableSchema,
    workspaces: Dictionary,
    branches: Dictionary,
    raw: Columns,
    rolled: Columns,
    watermark: Option<Timestamp>,
    batches: u64,
}

impl MetricsTable {
    /// Create an empty table
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            workspaces: Dictionary::default(),
            branches: Dictionary::default(),
            raw: Columns::default(),
            rolled: Columns::default(),
            watermark: None,
            batches: 0,
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Newest committed timestamp
    pub fn watermark(&self) -> Option<Timestamp> {
        self.watermark
    }

    /// Total rows, raw and rolled up
    pub fn len(&self) -> usize {
        self.raw.len() + self.rolled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert one batch of rows.
    ///
    /// The batch is rejected as a whole if any row fails validation or is
    /// older than a row committed before it. Returns the number of raw rows
    /// folded into rollup rows by this insert.
    pub fn insert_batch(&mut self, rows: &[MetricRow]) -> Result<usize> {
        let mut newest = self.watermark;
        for row in rows {
            if let Some(watermark) = newest {
                if row.time < watermark {
                    return Err(StorageError::OutOfOrder {
                        time: row.time,
                        watermark,
                    });
                }
            }
            row.validate()
                .map_err(|e| StorageError::InvalidData(e.to_string()))?;
            newest = Some(row.time);
        }

        for row in rows {
            let ws = self.workspaces.intern(&row.workspace_id);
            let br = self.branches.intern(&row.branch_id);
            // validated above
            self.raw.push(row.time, ws, br, row.value as u32);
        }

        self.watermark = newest;
        self.batches += 1;
        Ok(self.apply_ttl())
    }

    /// Fold every raw bucket whose last instant is at least `ttl` older than
    /// the watermark. Returns the number of raw rows folded.
    pub fn apply_ttl(&mut self) -> usize {
        let Some(watermark) = self.watermark else {
            return 0;
        };
        let ttl = self.schema.ttl;
        let bucket = self.schema.bucket;

        let expired = self.raw.time.partition_point(|&t| {
            let last_instant = bucket_start(t, bucket).saturating_add(bucket - 1);
            last_instant.saturating_add(ttl) <= watermark
        });
        if expired == 0 {
            return 0;
        }

        let mut groups: FxHashMap<(u32, u32, Timestamp), Accumulator> = FxHashMap::default();
        for i in 0..expired {
            let time = self.raw.time[i];
            let value = self.raw.value[i];
            let key = (
                self.raw.workspace_id[i],
                self.raw.branch_id[i],
                bucket_start(time, bucket),
            );
            groups
                .entry(key)
                .and_modify(|acc| acc.push(value))
                .or_insert_with(|| Accumulator::new(time, value));
        }

        let mut folded: Vec<_> = groups.into_iter().collect();
        folded.sort_unstable_by_key(|(key, _)| *key);
        let group_count = folded.len();
        for ((ws, br, _), acc) in folded {
            self.rolled
                .push(acc.first_time, ws, br, acc.finish(self.schema.rollup));
        }
        self.raw.drain_prefix(expired);

        debug!(
            table = %self.schema.name,
            folded = expired,
            groups = group_count,
            "Rolled up expired buckets"
        );
        expired
    }

    /// All rows ordered by `(workspace_id, branch_id, bucket(time), time)`
    pub fn rows(&self) -> Vec<MetricRow> {
        self.collect(|_, _, _| true)
    }

    /// Rows whose time falls within `range`, in key order
    pub fn scan(&self, range: TimeRange) -> Vec<MetricRow> {
        self.collect(|time, _, _| range.contains(time))
    }

    /// Rows of one (workspace, branch) series, in time order
    pub fn series(&self, workspace_id: &str, branch_id: &str) -> Vec<MetricRow> {
        let (Some(ws), Some(br)) = (
            self.workspaces.lookup(workspace_id),
            self.branches.lookup(branch_id),
        ) else {
            return Vec::new();
        };
        self.collect(|_, w, b| w == ws && b == br)
    }

    pub fn stats(&self) -> TableStats {
        TableStats {
            rows: self.len(),
            raw_rows: self.raw.len(),
            rolled_up_rows: self.rolled.len(),
            workspaces: self.workspaces.len(),
            branches: self.branches.len(),
            batches: self.batches,
            watermark: self.watermark,
        }
    }

    fn collect<F>(&self, filter: F) -> Vec<MetricRow>
    where
        F: Fn(Timestamp, u32, u32) -> bool,
    {
        let mut rows = Vec::new();
        for columns in [&self.rolled, &self.raw] {
            for i in 0..columns.len() {
                let (time, ws, br) = (
                    columns.time[i],
                    columns.workspace_id[i],
                    columns.branch_id[i],
                );
                if filter(time, ws, br) {
                    rows.push(MetricRow::new(
                        time,
                        self.workspaces.get(ws),
                        self.branches.get(br),
                        columns.value[i] as u64,
                    ));
                }
            }
        }

        let bucket = self.schema.bucket;
        rows.sort_by(|a, b| {
            a.workspace_id
                .cmp(&b.workspace_id)
                .then_with(|| a.branch_id.cmp(&b.branch_id))
                .then_with(|| bucket_start(a.time, bucket).cmp(&bucket_start(b.time, bucket)))
                .then_with(|| a.time.cmp(&b.time))
        });
        rows
    }
}
