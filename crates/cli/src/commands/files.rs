// Disk I/O load command

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args};
use tokio_util::sync::CancellationToken;
use tracing::info;
use troll_replicator::jobs::{write_file, ContentPolicy, FileJob, FillJob, SizePolicy};
use troll_replicator::{Replicator, ReplicatorConfig};

use super::{run_to_report, size_arg, RunOptions, DEFAULT_LONG_JOB_DRAIN};

#[derive(Debug, Args)]
pub struct FilesArgs {
    /// Directory to write into (or the file itself with --single)
    #[arg(long, default_value = "/tmp")]
    pub path: PathBuf,

    /// File size, or the upper bound of a random size (e.g. 512, 4k, 1m)
    #[arg(long, default_value = "512", value_parser = size_arg)]
    pub size: u64,

    /// Maximum concurrent writers
    #[arg(long, short, default_value_t = 1)]
    pub workers: usize,

    /// Admission tick in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub rate: u64,

    /// Write a single file at --path and exit
    #[arg(long)]
    pub single: bool,

    /// Fresh random bytes for every write (--bytes=false reuses one buffer)
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub bytes: bool,

    /// Write exactly --size bytes instead of a random size up to it
    #[arg(long)]
    pub fixed: bool,

    /// With --single, keep appending --size chunks until interrupted
    #[arg(long, requires = "single")]
    pub fill: bool,
}

impl FilesArgs {
    fn content(&self) -> ContentPolicy {
        if self.bytes {
            ContentPolicy::Random
        } else {
            ContentPolicy::Repeated
        }
    }

    fn size_policy(&self) -> SizePolicy {
        if self.fixed {
            SizePolicy::Fixed { bytes: self.size }
        } else {
            SizePolicy::Random { max: self.size }
        }
    }
}

pub async fn run(args: FilesArgs, options: RunOptions, cancel: CancellationToken) -> Result<()> {
    if args.fill {
        return run_fill(args, options, cancel).await;
    }

    if args.single {
        let written = write_file(&args.path, args.size)
            .await
            .with_context(|| format!("failed to write {}", args.path.display()))?;
        info!(path = %written.path.display(), bytes = written.bytes, "Wrote single file");
        return Ok(());
    }

    if !args.path.is_dir() {
        bail!("{} is not a directory", args.path.display());
    }

    let config = options.configure(
        ReplicatorConfig::new("files")
            .with_ceiling(args.workers)
            .with_tick_period(Duration::from_millis(args.rate)),
    );
    let job = FileJob::new(&args.path, args.size_policy(), args.content());

    run_to_report(Replicator::new(config, job)?, cancel, options.output).await
}

async fn run_fill(args: FilesArgs, options: RunOptions, cancel: CancellationToken) -> Result<()> {
    let job = FillJob::create(&args.path, args.size, args.content())
        .with_context(|| format!("failed to create {}", args.path.display()))?;

    let config = ReplicatorConfig::new("fill")
        .with_ceiling(1)
        .with_tick_period(Duration::from_millis(args.rate))
        .with_drain_timeout(options.drain_or(DEFAULT_LONG_JOB_DRAIN));

    run_to_report(Replicator::new(config, job)?, cancel, options.output).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    fn options() -> RunOptions {
        RunOptions {
            output: OutputFormat::Text,
            drain: None,
        }
    }

    fn args(path: PathBuf) -> FilesArgs {
        FilesArgs {
            path,
            size: 1024,
            workers: 1,
            rate: 10,
            single: false,
            bytes: true,
            fixed: false,
            fill: false,
        }
    }

    #[test]
    fn test_policies_follow_flags() {
        let mut args = args(PathBuf::from("/tmp"));
        assert_eq!(args.size_policy(), SizePolicy::Random { max: 1024 });
        assert_eq!(args.content(), ContentPolicy::Random);

        args.fixed = true;
        args.bytes = false;
        assert_eq!(args.size_policy(), SizePolicy::Fixed { bytes: 1024 });
        assert_eq!(args.content(), ContentPolicy::Repeated);
    }

    #[tokio::test]
    async fn test_single_writes_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one");
        let mut args = args(path.clone());
        args.single = true;

        run(args, options(), CancellationToken::new()).await.unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 1024);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_missing_directory_is_error() {
        let args = args(PathBuf::from("/nonexistent/troll"));
        assert!(run(args, options(), CancellationToken::new()).await.is_err());
    }
}
