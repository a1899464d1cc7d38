//! End-to-end runs of the replicator against synthetic and domain jobs
//!
//! Run with: cargo test -p troll-replicator --test replicator_test

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use troll_replicator::jobs::{BurnJob, ContentPolicy, FileJob, MemoryJob, NetworkJob, SizePolicy};
use troll_replicator::monitor::CpuMonitor;
use troll_replicator::prelude::*;

struct Tick;

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("tick")
    }
}

impl Payload for Tick {}

/// Sleeps for a fixed time and counts executions
struct Sleeper {
    work: Duration,
    executed: AtomicU64,
}

impl Sleeper {
    fn new(work: Duration) -> Self {
        Self {
            work,
            executed: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl Job for Sleeper {
    const KIND: &'static str = "sleeper";
    type Input = ();
    type Output = Tick;

    fn next_input(&self) -> Self::Input {}

    async fn execute(&self, _ctx: &JobContext, _input: ()) -> Result<Tick, JobError> {
        self.executed.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.work).await;
        Ok(Tick)
    }
}

/// Always fails
struct Failing;

#[async_trait]
impl Job for Failing {
    const KIND: &'static str = "failing";
    type Input = ();
    type Output = Tick;

    fn next_input(&self) -> Self::Input {}

    async fn execute(&self, _ctx: &JobContext, _input: ()) -> Result<Tick, JobError> {
        Err(JobError::Invalid("always fails".to_string()))
    }
}

fn cancel_after(after: Duration) -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        trigger.cancel();
    });
    token
}

fn assert_accounted(report: &RunReport) {
    assert_eq!(
        report.stats.completed() + report.abandoned,
        report.dispatched,
        "every dispatched job is either completed or abandoned"
    );
}

#[tokio::test(start_paused = true)]
async fn test_single_worker_dispatches_once_per_tick() {
    let config = ReplicatorConfig::new("paced")
        .with_ceiling(1)
        .with_tick_period(Duration::from_millis(100));
    let mut replicator = Replicator::new(config, Sleeper::new(Duration::from_millis(10))).unwrap();

    let report = replicator
        .run(cancel_after(Duration::from_millis(500)))
        .await
        .unwrap();

    assert!(
        (4..=5).contains(&report.dispatched),
        "dispatched {}",
        report.dispatched
    );
    assert_eq!(report.peak_active, 1);
    assert_eq!(report.stats.errors, 0);
    assert_accounted(&report);
}

#[tokio::test(start_paused = true)]
async fn test_drain_collects_in_flight_results() {
    let config = ReplicatorConfig::new("drained")
        .with_ceiling(4)
        .with_tick_period(Duration::from_millis(20))
        .with_drain_timeout(Duration::from_secs(5));
    let mut replicator = Replicator::new(config, Sleeper::new(Duration::from_millis(75))).unwrap();

    let report = replicator
        .run(cancel_after(Duration::from_millis(300)))
        .await
        .unwrap();

    assert_eq!(report.abandoned, 0);
    assert_eq!(report.stats.completed(), report.dispatched);
    assert_eq!(report.stats.successes, report.dispatched);
    assert!(report.stats.average().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_without_drain_in_flight_jobs_are_abandoned() {
    let config = ReplicatorConfig::new("abandoning")
        .with_ceiling(1)
        .with_tick_period(Duration::from_millis(100));
    let mut replicator = Replicator::new(config, Sleeper::new(Duration::from_secs(10))).unwrap();

    let report = replicator
        .run(cancel_after(Duration::from_millis(250)))
        .await
        .unwrap();

    assert_eq!(report.dispatched, 1);
    assert_eq!(report.abandoned, 1);
    assert_eq!(report.stats.completed(), 0);
    assert_accounted(&report);
}

#[tokio::test(start_paused = true)]
async fn test_no_dispatch_after_cancellation() {
    let config = ReplicatorConfig::new("stopped")
        .with_ceiling(2)
        .with_tick_period(Duration::from_millis(50));
    let mut replicator = Replicator::new(config, Sleeper::new(Duration::from_millis(5))).unwrap();

    let report = replicator
        .run(cancel_after(Duration::from_millis(275)))
        .await
        .unwrap();
    let executed = replicator.job().executed.load(Ordering::SeqCst);

    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(replicator.job().executed.load(Ordering::SeqCst), executed);
    assert_eq!(executed, report.dispatched);
    assert_eq!(replicator.state(), RunState::Reported);
}

#[tokio::test(start_paused = true)]
async fn test_all_failures_report_no_data() {
    let config = ReplicatorConfig::new("broken")
        .with_ceiling(3)
        .with_tick_period(Duration::from_millis(100));
    let mut replicator = Replicator::new(config, Failing).unwrap();

    let report = replicator
        .run(cancel_after(Duration::from_millis(350)))
        .await
        .unwrap();

    assert_eq!(report.stats.successes, 0);
    assert!(report.stats.errors > 0);
    assert_eq!(report.stats.shortest, None);
    assert_eq!(report.stats.longest, None);

    let text = report.to_string();
    assert!(text.contains("Avg Job Time:        no data"));
    assert!(text.contains("Shortest Job Time:   no data"));
}

#[tokio::test]
async fn test_unreachable_targets_count_as_errors() {
    let job = NetworkJob::new(
        vec![
            "http://127.0.0.1:1/".to_string(),
            "http://127.0.0.1:1/health".to_string(),
        ],
        Duration::from_secs(2),
    )
    .unwrap();
    let config = ReplicatorConfig::new("network")
        .with_ceiling(2)
        .with_tick_period(Duration::from_millis(20))
        .with_drain_timeout(Duration::from_secs(5));
    let mut replicator = Replicator::new(config, job).unwrap();

    let report = replicator
        .run(cancel_after(Duration::from_millis(300)))
        .await
        .unwrap();

    assert!(report.total_calls() > 0);
    assert_eq!(report.stats.errors, report.total_calls());
    assert_eq!(report.stats.successes, 0);
    assert!(report.stats.counters.status_codes.is_empty());
    assert_accounted(&report);
}

#[tokio::test]
async fn test_fixed_size_files_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let job = FileJob::new(
        dir.path(),
        SizePolicy::Fixed { bytes: 1024 },
        ContentPolicy::Random,
    );
    let config = ReplicatorConfig::new("files")
        .with_ceiling(2)
        .with_tick_period(Duration::from_millis(20))
        .with_drain_timeout(Duration::from_secs(5));
    let mut replicator = Replicator::new(config, job).unwrap();

    let report = replicator
        .run(cancel_after(Duration::from_millis(200)))
        .await
        .unwrap();

    let files: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().metadata().unwrap().len())
        .collect();

    assert!(report.stats.successes > 0);
    assert_eq!(files.len() as u64, report.stats.successes);
    assert!(files.iter().all(|len| *len == 1024));
    assert_eq!(
        report.stats.counters.bytes_written,
        1024 * report.stats.successes
    );
}

#[tokio::test]
async fn test_shared_memory_region_matches_bytes_written() {
    let job = MemoryJob::shared(8 * 1024, 4, true).unwrap();
    let region = Arc::clone(job.region().unwrap());
    let config = ReplicatorConfig::new("mem")
        .with_ceiling(4)
        .with_tick_period(Duration::from_millis(10))
        .with_drain_timeout(Duration::from_secs(5));
    let mut replicator = Replicator::new(config, job).unwrap();

    let report = replicator
        .run(cancel_after(Duration::from_millis(200)))
        .await
        .unwrap();

    assert_eq!(report.abandoned, 0);
    assert_eq!(report.stats.errors, 0);

    // Each job adds one to every cell in its slice.
    let touched: i64 = region.snapshot(0, region.len()).iter().sum();
    assert_eq!(touched as u64 * 8, report.stats.counters.bytes_written);
    assert_eq!(
        report.stats.counters.bytes_read,
        report.stats.counters.bytes_written
    );
}

#[tokio::test]
async fn test_cpu_burn_with_monitor() {
    let config = ReplicatorConfig::new("cpu")
        .with_ceiling(1)
        .with_tick_period(Duration::from_millis(50))
        .with_drain_timeout(Duration::from_secs(5));
    let mut replicator = Replicator::new(config, BurnJob::new().with_batch(4096))
        .unwrap()
        .with_observer(CpuMonitor::new());

    let report = replicator
        .run(cancel_after(Duration::from_millis(300)))
        .await
        .unwrap();

    assert_eq!(report.dispatched, 1);
    assert_eq!(report.stats.successes, 1);
    assert_eq!(report.abandoned, 0);
}

#[tokio::test(start_paused = true)]
async fn test_report_json_shape() {
    let config = ReplicatorConfig::new("json")
        .with_ceiling(1)
        .with_tick_period(Duration::from_millis(100))
        .with_drain_timeout(Duration::from_secs(1));
    let mut replicator = Replicator::new(config, Sleeper::new(Duration::from_millis(10))).unwrap();

    let report = replicator
        .run(cancel_after(Duration::from_millis(250)))
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(value["name"], "json");
    assert_eq!(value["kind"], "sleeper");
    assert_eq!(value["dispatched"], report.dispatched);
    assert_eq!(value["stats"]["successes"], report.stats.successes);
}
