// HTTP load command

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::info;
use troll_replicator::jobs::{resolve_targets, NetworkJob};
use troll_replicator::{Replicator, ReplicatorConfig};

use super::{run_to_report, RunOptions};

#[derive(Debug, Args)]
pub struct NetworkArgs {
    /// Target URLs, comma or space separated
    pub urls: Vec<String>,

    /// Read targets from a file, one URL per line (replaces positional URLs)
    #[arg(long, short)]
    pub file: Option<PathBuf>,

    /// Admission tick in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub rate: u64,

    /// Maximum concurrent requests
    #[arg(long, short, default_value_t = 1)]
    pub workers: usize,

    /// Upper bound of a random delay before each request in milliseconds (0 disables)
    #[arg(long, default_value_t = 0)]
    pub sleep: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
}

pub async fn run(args: NetworkArgs, options: RunOptions, cancel: CancellationToken) -> Result<()> {
    let targets = resolve_targets(args.urls.as_slice(), args.file.as_deref())?;
    info!(targets = targets.len(), "Loaded targets");

    let job = NetworkJob::new(targets, Duration::from_secs(args.timeout))?;
    let config = options.configure(
        ReplicatorConfig::new("network")
            .with_ceiling(args.workers)
            .with_tick_period(Duration::from_millis(args.rate))
            .with_jitter(Duration::from_millis(args.sleep)),
    );

    run_to_report(Replicator::new(config, job)?, cancel, options.output).await
}
