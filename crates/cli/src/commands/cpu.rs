// CPU load command

use std::num::NonZeroUsize;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;
use troll_replicator::jobs::BurnJob;
use troll_replicator::monitor::CpuMonitor;
use troll_replicator::{Replicator, ReplicatorConfig};

use super::{run_to_report, RunOptions, DEFAULT_LONG_JOB_DRAIN};

#[derive(Debug, Args)]
pub struct CpuArgs {
    /// Busy workers (default: one less than the CPU count, at least 1)
    #[arg(long, short)]
    pub workers: Option<usize>,

    /// Print per-CPU utilization every tick
    #[arg(long)]
    pub show: bool,

    /// Refresh interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub rate: u64,
}

/// One less than the available parallelism, never below one
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}

pub async fn run(args: CpuArgs, options: RunOptions, cancel: CancellationToken) -> Result<()> {
    let config = ReplicatorConfig::new("cpu")
        .with_ceiling(args.workers.unwrap_or_else(default_workers))
        .with_tick_period(Duration::from_millis(args.rate))
        .with_drain_timeout(options.drain_or(DEFAULT_LONG_JOB_DRAIN));

    let mut replicator = Replicator::new(config, BurnJob::new())?;
    if args.show {
        replicator = replicator.with_observer(CpuMonitor::new());
    }

    run_to_report(replicator, cancel, options.output).await
}
