// Subcommand implementations

pub mod cpu;
pub mod files;
pub mod mem;
pub mod network;

use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;
use troll_replicator::{Job, Replicator, ReplicatorConfig};

use crate::output::OutputFormat;

/// Options shared by every subcommand
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub output: OutputFormat,
    pub drain: Option<Duration>,
}

impl RunOptions {
    /// Drain timeout, falling back to `default` when none was given
    pub fn drain_or(&self, default: Duration) -> Duration {
        self.drain.unwrap_or(default)
    }

    /// Apply the global drain setting to `config`
    pub fn configure(&self, config: ReplicatorConfig) -> ReplicatorConfig {
        match self.drain {
            Some(timeout) => config.with_drain_timeout(timeout),
            None => config,
        }
    }
}

/// Drain used by jobs that only report once cancelled
pub const DEFAULT_LONG_JOB_DRAIN: Duration = Duration::from_secs(2);

/// clap value parser for size strings such as `512`, `4k` or `64MB`
pub fn size_arg(input: &str) -> Result<u64, String> {
    troll_replicator::parse_size(input).map_err(|e| e.to_string())
}

/// Drive `replicator` until cancelled and print its report
pub async fn run_to_report<J: Job>(
    mut replicator: Replicator<J>,
    cancel: CancellationToken,
    output: OutputFormat,
) -> Result<()> {
    info!(
        name = %replicator.config().name,
        ceiling = replicator.config().ceiling,
        "Press Ctrl-C to stop"
    );

    let report = replicator
        .run(cancel)
        .await
        .context("replicator run failed")?;

    output.print_report(&report)
}
