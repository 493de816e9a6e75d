//! usagegen storage - in-memory columnar metrics table
//!
//! This crate provides the storage side of a seeding run:
//! - `TableSchema`: table name, retention TTL, rollup bucket and function
//! - `MetricsTable`: dictionary-encoded columns keyed by
//!   `(workspace_id, branch_id, bucket(time), time)`
//! - `Catalog`: the set of tables, shared between a sink and its readers
//! - `MemorySink`: a `Sink` that drops and recreates its table on setup and
//!   rolls expired hourly buckets up into one averaged row

pub mod catalog;
pub mod error;
pub mod schema;
pub mod sink;
pub mod table;

pub use catalog::Catalog;
pub use error::{Result, StorageError};
pub use schema::{RollupFunction, TableSchema};
pub use sink::MemorySink;
pub use table::{MetricsTable, TableStats};
