//! Job trait definition

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::JobContext;
use crate::stats::DomainCounters;

/// Error type for a single failed job
///
/// A job error is transient: it is recorded, counted and logged, and the
/// replicator keeps dispatching.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum JobError {
    /// Filesystem or other I/O failure
    #[error("io error: {0}")]
    Io(String),

    /// Network or HTTP transport failure
    #[error("http error: {0}")]
    Http(String),

    /// A measurement taken by the job could not be interpreted
    #[error("sample error: {0}")]
    Sample(String),

    /// The task running the job panicked or was aborted
    #[error("job task failed: {0}")]
    Panicked(String),

    /// The job rejected its input
    #[error("invalid job input: {0}")]
    Invalid(String),
}

impl From<std::io::Error> for JobError {
    fn from(err: std::io::Error) -> Self {
        JobError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for JobError {
    fn from(err: reqwest::Error) -> Self {
        JobError::Http(err.to_string())
    }
}

impl From<tokio::task::JoinError> for JobError {
    fn from(err: tokio::task::JoinError) -> Self {
        JobError::Panicked(err.to_string())
    }
}

/// Domain data carried by a successful job
///
/// `Display` renders the per-job progress line; `tally` folds the payload
/// into the run's domain counters.
pub trait Payload: fmt::Display + Send + 'static {
    /// Add this payload's byte or status counters to the running totals
    fn tally(&self, _counters: &mut DomainCounters) {}
}

/// Outcome of one dispatched job
///
/// Produced exactly once per dispatch and consumed exactly once by the
/// aggregator.
#[derive(Debug)]
pub struct JobResult<O> {
    /// Dispatch sequence number (starts at 1)
    pub sequence: u64,
    /// Domain payload or the error that ended the job
    pub outcome: Result<O, JobError>,
    /// Time spent executing, excluding jitter delay
    pub elapsed: Duration,
}

impl<O> JobResult<O> {
    /// Whether the job succeeded
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// One unit of domain-specific load work
///
/// The replicator asks the job for a fresh input on every dispatch and
/// runs `execute` concurrently with other dispatches of the same job.
///
/// # Example
///
/// ```ignore
/// use troll_replicator::prelude::*;
///
/// struct Ping;
///
/// #[async_trait]
/// impl Job for Ping {
///     const KIND: &'static str = "ping";
///     type Input = ();
///     type Output = Pong;
///
///     fn next_input(&self) -> Self::Input {}
///
///     async fn execute(&self, _ctx: &JobContext, _input: ()) -> Result<Pong, JobError> {
///         Ok(Pong)
///     }
/// }
/// ```
#[async_trait]
pub trait Job: Send + Sync + 'static {
    /// Short identifier used in logs and reports
    const KIND: &'static str;

    /// Input constructed by the controller for each dispatch
    type Input: Send + 'static;

    /// Payload returned on success
    type Output: Payload;

    /// Build the input for the next dispatch
    fn next_input(&self) -> Self::Input;

    /// Perform one unit of work
    ///
    /// Failures are returned as `JobError`, never by panicking. Jobs that
    /// run until stopped must poll `ctx.is_cancelled()` on a bounded cadence.
    async fn execute(&self, ctx: &JobContext, input: Self::Input)
        -> Result<Self::Output, JobError>;
}
