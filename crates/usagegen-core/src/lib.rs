//! usagegen core - shared types for the usage metrics seeder
//!
//! This crate provides the pieces every other usagegen crate agrees on:
//! - `Timestamp`: nanosecond-precision Unix epoch timestamps
//! - `MetricRow`: one `{time, workspace_id, branch_id, value}` observation
//! - `Sink` / `SinkBatch`: the contract a storage backend implements
//! - `parse_duration`: `"5m"`, `"1d"` style duration strings

pub mod duration;
pub mod error;
pub mod sink;
pub mod types;

pub use duration::parse_duration;
pub use error::{CoreError, Result, SinkError, SinkResult};
pub use sink::{RowBatch, Sink, SinkBatch};
pub use types::*;
