//! Wires a configuration into a generation run and drives a sink through it.

use crate::assignment::Assignment;
use crate::config::{format_instant, GeneratorConfig};
use crate::emitter::{BatchEmitter, EmitStats, TickProgress};
use crate::error::{ConfigError, GenerateError, Result};
use crate::identity::generate_ids;
use crate::report::{LatencyRecorder, RunReport};
use crate::walk::{WalkParams, WalkState};
use crate::window::TimeWindow;
use rand::rngs::StdRng;
use rand::Rng;
use std::time::Instant;
use tracing::{info, warn};
use usagegen_core::duration::{NANOS_PER_DAY, NANOS_PER_SECOND};
use usagegen_core::{bucket_start, Sink, Timestamp};

/// One generation run: a time window and the emitter that fills it.
pub struct Pipeline<R> {
    window: TimeWindow,
    emitter: BatchEmitter<R>,
}

impl Pipeline<StdRng> {
    /// Generates identities and the assignment from `config`.
    ///
    /// Workspace ids, branch ids and the assignment are all drawn from the
    /// run's random source, in that order.
    pub fn from_config(config: &GeneratorConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let window = config.time_window()?;

        let mut rng = config.rng()?;
        let workspaces = generate_ids(&mut rng, config.workspace_count);
        let branches = generate_ids(&mut rng, config.branch_count);
        let assignment = Assignment::random(workspaces, branches, &mut rng)?;

        Self::new(window, assignment, config.walk, rng)
    }
}

impl<R: Rng> Pipeline<R> {
    pub fn new(
        window: TimeWindow,
        assignment: Assignment,
        params: WalkParams,
        rng: R,
    ) -> std::result::Result<Self, ConfigError> {
        let walk = WalkState::new(params, assignment.branches())?;
        Ok(Self {
            window,
            emitter: BatchEmitter::new(assignment, walk, rng),
        })
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    pub fn emitter(&self) -> &BatchEmitter<R> {
        &self.emitter
    }

    /// Runs the whole window against `sink`.
    ///
    /// `setup()` comes first and `teardown()` always runs, even when setup
    /// or a batch failed. The first error wins; a teardown failure after an
    /// earlier error is only logged.
    pub async fn run<S, F>(&mut self, sink: &mut S, on_tick: F) -> Result<EmitStats>
    where
        S: Sink,
        F: FnMut(&TickProgress),
    {
        info!(
            workspaces = self.emitter.assignment().workspace_count(),
            branches = self.emitter.assignment().branch_count(),
            ticks = self.window.len(),
            "Starting generation"
        );

        let outcome = match sink.setup().await {
            Ok(()) => self.emitter.run(&self.window, sink, on_tick).await,
            Err(e) => Err(GenerateError::Initialization(e)),
        };

        match (outcome, sink.teardown().await) {
            (Ok(stats), Ok(())) => {
                info!(batches = stats.batches, rows = stats.rows, "Generation finished");
                Ok(stats)
            }
            (Ok(_), Err(e)) => Err(GenerateError::Initialization(e)),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(teardown)) => {
                warn!(error = %teardown, "Teardown failed after an earlier error");
                Err(e)
            }
        }
    }
}

/// Builds the pipeline from `config`, runs it against `sink` and reports.
///
/// `on_tick` sees every committed batch. The report's `table` section is
/// left empty; callers holding a storage handle fill it in.
pub async fn run_workload<S, F>(
    config: &GeneratorConfig,
    sink_name: &str,
    sink: &mut S,
    mut on_tick: F,
) -> Result<RunReport>
where
    S: Sink,
    F: FnMut(&TickProgress),
{
    let mut pipeline = Pipeline::from_config(config)?;
    let window = *pipeline.window();

    let mut latencies = LatencyRecorder::new();
    let mut current_day = None;
    let started = Instant::now();

    let stats = pipeline
        .run(sink, |progress| {
            latencies.record(progress.commit_latency);

            if let Some(day) = day_started(&mut current_day, progress.time) {
                info!(
                    day = %format_instant(day),
                    tick = progress.index,
                    total = progress.total,
                    "Generating"
                );
            }

            on_tick(progress);
        })
        .await?;

    let assignment = pipeline.emitter().assignment();
    Ok(RunReport {
        sink: sink_name.to_string(),
        start: format_instant(window.start()),
        end: format_instant(window.end()),
        step_secs: window.step() as f64 / NANOS_PER_SECOND as f64,
        seed: config.seed,
        workspaces: assignment.workspace_count(),
        branches: assignment.branch_count(),
        ticks: stats.batches,
        rows: stats.rows,
        batches: stats.batches,
        duration: started.elapsed(),
        commit_latency: latencies.stats(),
        final_usage: pipeline.emitter().walk().summary(),
        table: None,
    })
}

/// Returns the start of `time`'s day when it differs from `current`,
/// including the first tick of a run.
fn day_started(current: &mut Option<Timestamp>, time: Timestamp) -> Option<Timestamp> {
    let day = bucket_start(time, NANOS_PER_DAY);
    if *current == Some(day) {
        return None;
    }
    *current = Some(day);
    Some(day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rand::SeedableRng;
    use usagegen_core::{RowBatch, SinkError, SinkResult};

    /// Sink that fails at a chosen lifecycle stage and counts teardowns.
    #[derive(Default)]
    struct FlakySink {
        fail_setup: bool,
        fail_commit: bool,
        fail_teardown: bool,
        commits: usize,
        teardowns: usize,
    }

    #[async_trait]
    impl Sink for FlakySink {
        type Batch = RowBatch;

        async fn setup(&mut self) -> SinkResult<()> {
            if self.fail_setup {
                return Err(SinkError::Schema("no table".to_string()));
            }
            Ok(())
        }

        async fn open_batch(&mut self) -> SinkResult<RowBatch> {
            Ok(RowBatch::new())
        }

        async fn commit(&mut self, _batch: RowBatch) -> SinkResult<()> {
            if self.fail_commit {
                return Err(SinkError::Ingestion("rejected".to_string()));
            }
            self.commits += 1;
            Ok(())
        }

        async fn teardown(&mut self) -> SinkResult<()> {
            self.teardowns += 1;
            if self.fail_teardown {
                return Err(SinkError::Connection("gone".to_string()));
            }
            Ok(())
        }
    }

    fn pipeline() -> Pipeline<StdRng> {
        let assignment = Assignment::from_buckets(vec![(
            "ws-1".to_string(),
            vec!["br-1".to_string(), "br-2".to_string()],
        )])
        .unwrap();
        let window = TimeWindow::new(0, 30, 10).unwrap();
        Pipeline::new(
            window,
            assignment,
            WalkParams::default(),
            StdRng::seed_from_u64(3),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_run_success() {
        let mut sink = FlakySink::default();
        let mut ticks = Vec::new();
        let stats = pipeline()
            .run(&mut sink, |p| ticks.push(p.index))
            .await
            .unwrap();

        assert_eq!(stats, EmitStats { batches: 3, rows: 6 });
        assert_eq!(ticks, vec![0, 1, 2]);
        assert_eq!(sink.commits, 3);
        assert_eq!(sink.teardowns, 1);
    }

    #[tokio::test]
    async fn test_setup_failure_still_tears_down() {
        let mut sink = FlakySink {
            fail_setup: true,
            ..Default::default()
        };
        let err = pipeline().run(&mut sink, |_| {}).await.unwrap_err();

        assert!(matches!(
            err,
            GenerateError::Initialization(SinkError::Schema(_))
        ));
        assert_eq!(sink.commits, 0);
        assert_eq!(sink.teardowns, 1);
    }

    #[tokio::test]
    async fn test_commit_failure_keeps_first_error() {
        let mut sink = FlakySink {
            fail_commit: true,
            fail_teardown: true,
            ..Default::default()
        };
        let err = pipeline().run(&mut sink, |_| {}).await.unwrap_err();

        assert!(matches!(err, GenerateError::Ingestion { time: 0, .. }));
        assert_eq!(sink.teardowns, 1);
    }

    #[tokio::test]
    async fn test_teardown_failure_after_success() {
        let mut sink = FlakySink {
            fail_teardown: true,
            ..Default::default()
        };
        let err = pipeline().run(&mut sink, |_| {}).await.unwrap_err();

        assert!(matches!(
            err,
            GenerateError::Initialization(SinkError::Connection(_))
        ));
        assert_eq!(sink.commits, 3);
    }

    #[test]
    fn test_new_rejects_invalid_walk() {
        let params = WalkParams {
            max_delta: 0,
            ..Default::default()
        };
        let result = Pipeline::new(
            TimeWindow::new(0, 10, 10).unwrap(),
            Assignment::from_buckets(Vec::new()).unwrap(),
            params,
            StdRng::seed_from_u64(0),
        );
        assert!(matches!(result, Err(ConfigError::InvalidWalk(_))));
    }

    #[tokio::test]
    async fn test_run_workload_report() {
        let config = GeneratorConfig {
            start: "2023-03-01 00:00:00".to_string(),
            end: "2023-03-01 01:00:00".to_string(),
            workspace_count: 4,
            branch_count: 10,
            seed: Some(11),
            ..Default::default()
        };
        let mut sink = FlakySink::default();
        let mut seen = 0;

        let report = run_workload(&config, "test", &mut sink, |_| seen += 1)
            .await
            .unwrap();

        assert_eq!(seen, 12);
        assert_eq!(report.sink, "test");
        assert_eq!(report.workspaces, 4);
        assert_eq!(report.branches, 10);
        assert_eq!(report.ticks, 12);
        assert_eq!(report.rows, 120);
        assert_eq!(report.step_secs, 300.0);
        assert_eq!(report.start, "2023-03-01T00:00:00+00:00");
        assert_eq!(report.commit_latency.count, 12);
        assert_eq!(report.final_usage.branches, 10);
        assert!(report.table.is_none());
    }

    #[test]
    fn test_day_started_includes_first_day() {
        let mut current = None;
        let step = 5 * 60 * NANOS_PER_SECOND;

        assert_eq!(day_started(&mut current, 0), Some(0));
        assert_eq!(day_started(&mut current, step), None);
        assert_eq!(day_started(&mut current, NANOS_PER_DAY - step), None);
        assert_eq!(day_started(&mut current, NANOS_PER_DAY), Some(NANOS_PER_DAY));

        // Starting mid-day still reports that day
        let mut current = None;
        assert_eq!(day_started(&mut current, 3 * NANOS_PER_DAY + step), Some(3 * NANOS_PER_DAY));
        assert_eq!(day_started(&mut current, i64::MIN + 1), Some(i64::MIN));
    }

    #[tokio::test]
    async fn test_run_workload_invalid_config() {
        let config = GeneratorConfig {
            step: "0m".to_string(),
            ..Default::default()
        };
        let mut sink = FlakySink::default();
        let err = run_workload(&config, "test", &mut sink, |_| {})
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GenerateError::Config(ConfigError::NonPositiveStep(0))
        ));
        assert_eq!(sink.teardowns, 0);
    }
}
