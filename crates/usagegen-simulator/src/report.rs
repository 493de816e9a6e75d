//! Run report.

use crate::walk::UsageSummary;
use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use usagegen_storage::TableStats;

/// Commit latency statistics, in microseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub count: u64,
    pub min_us: u64,
    pub max_us: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
}

impl LatencyStats {
    pub fn from_histogram(histogram: &Histogram<u64>) -> Self {
        if histogram.is_empty() {
            return Self::default();
        }

        Self {
            count: histogram.len(),
            min_us: histogram.min(),
            max_us: histogram.max(),
            mean_us: histogram.mean() as u64,
            p50_us: histogram.value_at_quantile(0.50),
            p95_us: histogram.value_at_quantile(0.95),
            p99_us: histogram.value_at_quantile(0.99),
        }
    }

    /// Formats latency as a human-readable string.
    pub fn format_ms(&self) -> String {
        if self.count == 0 {
            "N/A".to_string()
        } else {
            format!(
                "p50={:.2}ms p95={:.2}ms p99={:.2}ms max={:.2}ms",
                self.p50_us as f64 / 1000.0,
                self.p95_us as f64 / 1000.0,
                self.p99_us as f64 / 1000.0,
                self.max_us as f64 / 1000.0
            )
        }
    }
}

/// Records commit latencies of a run.
pub struct LatencyRecorder {
    histogram: Option<Histogram<u64>>,
}

impl LatencyRecorder {
    /// Tracks 1µs to 10 minutes with 3 significant digits.
    pub fn new() -> Self {
        Self {
            histogram: Histogram::<u64>::new_with_bounds(1, 600_000_000, 3).ok(),
        }
    }

    pub fn record(&mut self, latency: Duration) {
        if let Some(histogram) = self.histogram.as_mut() {
            let micros = (latency.as_micros() as u64).max(1);
            histogram.saturating_record(micros);
        }
    }

    pub fn stats(&self) -> LatencyStats {
        self.histogram
            .as_ref()
            .map(LatencyStats::from_histogram)
            .unwrap_or_default()
    }
}

impl Default for LatencyRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub sink: String,
    /// First tick, RFC 3339
    pub start: String,
    /// End of the window, RFC 3339
    pub end: String,
    pub step_secs: f64,
    pub seed: Option<u64>,

    pub workspaces: usize,
    pub branches: usize,
    pub ticks: u64,
    pub rows: u64,
    pub batches: u64,
    pub duration: Duration,
    pub commit_latency: LatencyStats,

    /// Usage of every branch after the last tick
    pub final_usage: UsageSummary,

    /// Present for the in-memory sink
    pub table: Option<TableStats>,
}

impl RunReport {
    pub fn rows_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.rows as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Generates a JSON report.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Prints a summary to stdout.
    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(60));
        println!("GENERATION RESULTS");
        println!("{}", "=".repeat(60));

        println!(
            "\nSink: {} | Window: {} .. {} every {}s",
            self.sink, self.start, self.end, self.step_secs
        );
        println!(
            "Workspaces: {} | Branches: {} | Ticks: {}",
            format_number(self.workspaces as u64),
            format_number(self.branches as u64),
            format_number(self.ticks)
        );

        println!("\nWRITES:");
        println!(
            "   Rows: {} in {} batches ({:.0}/s over {:.1}s)",
            format_number(self.rows),
            format_number(self.batches),
            self.rows_per_second(),
            self.duration.as_secs_f64()
        );
        println!("   Commit latency: {}", self.commit_latency.format_ms());

        println!("\nUSAGE AFTER LAST TICK:");
        if self.final_usage.branches == 0 {
            println!("   No branches");
        } else {
            println!(
                "   min={} max={} mean={:.1}",
                self.final_usage.min, self.final_usage.max, self.final_usage.mean
            );
        }

        if let Some(table) = &self.table {
            println!("\nTABLE:");
            println!(
                "   Rows: {} ({} raw, {} rolled up)",
                format_number(table.rows as u64),
                format_number(table.raw_rows as u64),
                format_number(table.rolled_up_rows as u64)
            );
        }

        println!("\n{}", "=".repeat(60));
    }
}

/// Formats a number with thousand separators.
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> RunReport {
        RunReport {
            sink: "memory".to_string(),
            start: "2023-03-01T00:00:00+00:00".to_string(),
            end: "2023-03-01T00:15:00+00:00".to_string(),
            step_secs: 300.0,
            seed: Some(1),
            workspaces: 2,
            branches: 3,
            ticks: 3,
            rows: 9,
            batches: 3,
            duration: Duration::from_secs(3),
            commit_latency: LatencyStats::default(),
            final_usage: UsageSummary {
                branches: 3,
                min: 100,
                max: 200,
                mean: 150.0,
            },
            table: None,
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(8_928_000), "8,928,000");
    }

    #[test]
    fn test_rows_per_second() {
        let mut report = report();
        assert_eq!(report.rows_per_second(), 3.0);

        report.duration = Duration::ZERO;
        assert_eq!(report.rows_per_second(), 0.0);
    }

    #[test]
    fn test_latency_recorder() {
        let mut recorder = LatencyRecorder::new();
        assert_eq!(recorder.stats(), LatencyStats::default());
        assert_eq!(recorder.stats().format_ms(), "N/A");

        for ms in 1..=100u64 {
            recorder.record(Duration::from_millis(ms));
        }
        recorder.record(Duration::ZERO);

        let stats = recorder.stats();
        assert_eq!(stats.count, 101);
        assert_eq!(stats.min_us, 1);
        assert!(stats.p50_us >= 49_000 && stats.p50_us <= 51_000);
        assert!(stats.max_us >= 100_000 && stats.max_us <= 100_100);
    }

    #[test]
    fn test_to_json() {
        let json = report().to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["rows"], 9);
        assert_eq!(value["final_usage"]["max"], 200);
        assert!(value["table"].is_null());
    }
}
