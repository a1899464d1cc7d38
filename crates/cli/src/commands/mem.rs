// Memory load command

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::info;
use troll_replicator::jobs::MemoryJob;
use troll_replicator::monitor::MemoryMonitor;
use troll_replicator::{Replicator, ReplicatorConfig};

use super::{run_to_report, size_arg, RunOptions};

/// clap value parser for a cell count given as a size string
fn cells_arg(input: &str) -> Result<usize, String> {
    let cells = size_arg(input)?;
    usize::try_from(cells).map_err(|_| format!("{} cells do not fit in memory", cells))
}

#[derive(Debug, Args)]
pub struct MemArgs {
    /// Number of values in the memory region (e.g. 100, 64m)
    #[arg(long, default_value = "64m", value_parser = cells_arg)]
    pub size: usize,

    /// Maximum concurrent jobs
    #[arg(long, short, default_value_t = 1)]
    pub workers: usize,

    /// Admission tick in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub rate: u64,

    /// Allocate and free a private buffer per job instead of the shared region
    #[arg(long)]
    pub release: bool,

    /// Read each slice back and report its sum
    #[arg(long)]
    pub read: bool,

    /// Report process memory every tick
    #[arg(long)]
    pub force: bool,
}

impl MemArgs {
    fn job(&self) -> Result<MemoryJob> {
        if self.release {
            Ok(MemoryJob::release(self.size, self.workers, self.read))
        } else {
            Ok(MemoryJob::shared(self.size, self.workers, self.read)?)
        }
    }
}

pub async fn run(args: MemArgs, options: RunOptions, cancel: CancellationToken) -> Result<()> {
    let job = args.job()?;
    info!(
        cells = job.cells(),
        shared = job.region().is_some(),
        "Memory region ready"
    );

    let config = options.configure(
        ReplicatorConfig::new("mem")
            .with_ceiling(args.workers)
            .with_tick_period(Duration::from_millis(args.rate)),
    );

    let mut replicator = Replicator::new(config, job)?;
    if args.force {
        replicator = replicator.with_observer(MemoryMonitor::new());
    }

    run_to_report(replicator, cancel, options.output).await
}
