//! Synthetic usage generator for workspace/branch metrics.
//!
//! Seeds a time series store with a plausible usage history: branches are
//! spread across workspaces at random, each branch's usage drifts a little
//! every tick, and every tick is committed as one batch.
//!
//! # Default Scale
//! - 1,000 workspaces
//! - 10,000 branches
//! - one month of 5-minute ticks (8,928 batches, ~89M rows)
//!
//! # Sinks
//! - `memory`: in-process columnar table with 1-day TTL and hourly rollup
//! - `http`: InfluxDB line protocol over `POST /write`
//!
//! # Usage
//! ```bash
//! # Default run into the in-memory table
//! usagegen
//!
//! # One day of data for a small fleet, reproducible
//! usagegen --end "2023-03-02 00:00:00" --workspaces 10 --branches 100 --seed 42
//!
//! # Write to a running server
//! usagegen --sink http --server http://localhost:8086
//! ```

pub mod assignment;
pub mod config;
pub mod emitter;
pub mod error;
pub mod identity;
pub mod report;
pub mod walk;
pub mod window;
pub mod workload;
pub mod writer;

pub use assignment::Assignment;
pub use config::{GeneratorConfig, SinkKind};
pub use emitter::{BatchEmitter, EmitStats, TickProgress};
pub use error::{ConfigError, GenerateError, Result};
pub use report::RunReport;
pub use walk::{apply_drift, WalkParams, WalkState};
pub use window::TimeWindow;
pub use workload::{run_workload, Pipeline};
pub use writer::LineProtocolSink;
