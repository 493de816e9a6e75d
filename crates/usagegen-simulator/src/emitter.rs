//! Builds and commits one batch per timestamp.

use crate::assignment::Assignment;
use crate::error::{GenerateError, Result};
use crate::walk::WalkState;
use crate::window::TimeWindow;
use rand::Rng;
use std::time::{Duration, Instant};
use tracing::debug;
use usagegen_core::{MetricRow, Sink, SinkBatch, SinkResult, Timestamp};

/// Progress of a run, reported after every committed batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickProgress {
    /// Zero-based index of the tick
    pub index: usize,
    /// Total ticks in the window
    pub total: usize,
    pub time: Timestamp,
    /// Rows in the committed batch
    pub rows: usize,
    /// Time spent in `commit()`
    pub commit_latency: Duration,
}

/// Totals of a completed emission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitStats {
    pub batches: u64,
    pub rows: u64,
}

/// Owns the per-run state of the generator: the assignment, the usage of
/// every branch, and the random source.
pub struct BatchEmitter<R> {
    assignment: Assignment,
    walk: WalkState,
    rng: R,
}

impl<R: Rng> BatchEmitter<R> {
    pub fn new(assignment: Assignment, walk: WalkState, rng: R) -> Self {
        Self {
            assignment,
            walk,
            rng,
        }
    }

    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    pub fn walk(&self) -> &WalkState {
        &self.walk
    }

    /// Advances every branch once and appends its row to `batch`.
    ///
    /// Workspaces are visited in assignment order and, within a workspace,
    /// branches in the order they were assigned.
    pub fn fill_batch<B: SinkBatch>(&mut self, time: Timestamp, batch: &mut B) -> SinkResult<usize> {
        let mut rows = 0;
        for (workspace_id, branches) in self.assignment.iter() {
            for branch_id in branches {
                let value = self.walk.step(branch_id, &mut self.rng);
                batch.append(MetricRow::new(
                    time,
                    workspace_id.as_str(),
                    branch_id.as_str(),
                    value,
                ))?;
                rows += 1;
            }
        }
        Ok(rows)
    }

    /// Opens, fills and commits the batch of one timestamp.
    /// Returns the row count and the time spent committing.
    pub async fn emit_tick<S: Sink>(
        &mut self,
        sink: &mut S,
        time: Timestamp,
    ) -> Result<(usize, Duration)> {
        let ingestion = |source| GenerateError::Ingestion { time, source };

        let mut batch = sink.open_batch().await.map_err(ingestion)?;
        let rows = self.fill_batch(time, &mut batch).map_err(ingestion)?;

        let started = Instant::now();
        sink.commit(batch).await.map_err(ingestion)?;
        Ok((rows, started.elapsed()))
    }

    /// Emits every timestamp of `window` in order, calling `on_tick` after
    /// each commit. Stops at the first error.
    pub async fn run<S, F>(
        &mut self,
        window: &TimeWindow,
        sink: &mut S,
        mut on_tick: F,
    ) -> Result<EmitStats>
    where
        S: Sink,
        F: FnMut(&TickProgress),
    {
        let total = window.len();
        let mut stats = EmitStats::default();

        for (index, time) in window.iter().enumerate() {
            let (rows, commit_latency) = self.emit_tick(sink, time).await?;
            stats.batches += 1;
            stats.rows += rows as u64;

            debug!(tick = index, time, rows, "Committed batch");
            on_tick(&TickProgress {
                index,
                total,
                time,
                rows,
                commit_latency,
            });
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walk::WalkParams;
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use usagegen_core::{RowBatch, SinkError};

    /// Records every committed batch; optionally fails the n-th commit.
    #[derive(Default)]
    struct RecordingSink {
        commits: Vec<Vec<MetricRow>>,
        opened: usize,
        fail_commit_at: Option<usize>,
    }

    #[async_trait]
    impl Sink for RecordingSink {
        type Batch = RowBatch;

        async fn setup(&mut self) -> SinkResult<()> {
            Ok(())
        }

        async fn open_batch(&mut self) -> SinkResult<RowBatch> {
            self.opened += 1;
            Ok(RowBatch::new())
        }

        async fn commit(&mut self, batch: RowBatch) -> SinkResult<()> {
            if self.fail_commit_at == Some(self.commits.len()) {
                return Err(SinkError::Ingestion("server rejected batch".to_string()));
            }
            self.commits.push(batch.into_rows());
            Ok(())
        }

        async fn teardown(&mut self) -> SinkResult<()> {
            Ok(())
        }
    }

    fn fixed_assignment() -> Assignment {
        Assignment::from_buckets(vec![
            ("ws-a".to_string(), vec!["br-1".to_string(), "br-2".to_string()]),
            ("ws-b".to_string(), vec!["br-3".to_string()]),
            ("ws-c".to_string(), vec![]),
        ])
        .unwrap()
    }

    fn emitter(assignment: Assignment) -> BatchEmitter<StdRng> {
        let walk = WalkState::new(WalkParams::default(), assignment.branches()).unwrap();
        BatchEmitter::new(assignment, walk, StdRng::seed_from_u64(17))
    }

    #[test]
    fn test_fill_batch_visits_pairs_in_order() {
        let mut emitter = emitter(fixed_assignment());
        let mut batch = RowBatch::new();
        let rows = emitter.fill_batch(42, &mut batch).unwrap();
        assert_eq!(rows, 3);

        let pairs: Vec<(&str, &str)> = batch
            .rows()
            .iter()
            .map(|r| (r.workspace_id.as_str(), r.branch_id.as_str()))
            .collect();
        assert_eq!(pairs, vec![("ws-a", "br-1"), ("ws-a", "br-2"), ("ws-b", "br-3")]);
        assert!(batch.rows().iter().all(|r| r.time == 42));

        for row in batch.rows() {
            assert_eq!(emitter.walk().value(&row.branch_id), Some(row.value));
        }
    }

    #[tokio::test]
    async fn test_one_commit_per_tick() {
        let mut emitter = emitter(fixed_assignment());
        let mut sink = RecordingSink::default();
        let window = TimeWindow::new(0, 50, 10).unwrap();

        let mut progress = Vec::new();
        let stats = emitter
            .run(&window, &mut sink, |p| progress.push(*p))
            .await
            .unwrap();

        assert_eq!(stats, EmitStats { batches: 5, rows: 15 });
        assert_eq!(sink.opened, 5);
        assert_eq!(sink.commits.len(), 5);
        for (i, commit) in sink.commits.iter().enumerate() {
            assert_eq!(commit.len(), 3);
            assert!(commit.iter().all(|r| r.time == i as i64 * 10));
        }

        let indices: Vec<usize> = progress.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert!(progress.iter().all(|p| p.total == 5 && p.rows == 3));
    }

    #[tokio::test]
    async fn test_commit_failure_aborts_run() {
        let mut emitter = emitter(fixed_assignment());
        let mut sink = RecordingSink {
            fail_commit_at: Some(2),
            ..Default::default()
        };
        let window = TimeWindow::new(0, 100, 10).unwrap();

        let err = emitter.run(&window, &mut sink, |_| {}).await.unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Ingestion {
                time: 20,
                source: SinkError::Ingestion(_)
            }
        ));
        assert_eq!(sink.commits.len(), 2);
        assert_eq!(sink.opened, 3);
    }

    #[tokio::test]
    async fn test_append_failure_aborts_run() {
        let params = WalkParams {
            baseline: u32::MAX as u64,
            max_delta: 50,
            decrease_one_in: u32::MAX,
        };
        let assignment = fixed_assignment();
        let walk = WalkState::new(params, assignment.branches()).unwrap();
        let mut emitter = BatchEmitter::new(assignment, walk, StdRng::seed_from_u64(1));
        let mut sink = RecordingSink::default();

        // Grows past the UInt32 column within a few ticks
        let window = TimeWindow::new(0, 1_000, 1).unwrap();
        let err = emitter.run(&window, &mut sink, |_| {}).await.unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Ingestion {
                source: SinkError::Encoding(_),
                ..
            }
        ));
        assert!(sink.commits.len() < 1_000);
    }

    #[tokio::test]
    async fn test_empty_assignment_still_commits_each_tick() {
        let mut emitter = emitter(Assignment::from_buckets(vec![]).unwrap());
        let mut sink = RecordingSink::default();
        let window = TimeWindow::new(0, 3, 1).unwrap();

        let stats = emitter.run(&window, &mut sink, |_| {}).await.unwrap();
        assert_eq!(stats, EmitStats { batches: 3, rows: 0 });
        assert!(sink.commits.iter().all(|c| c.is_empty()));
    }
}
