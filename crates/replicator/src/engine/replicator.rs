//! Replicator: the bounded-concurrency dispatch-and-aggregate loop
//!
//! One coordinating loop owns the active worker count and the running
//! statistics. It waits on cancellation, job completion and the admission
//! tick, and reacts to whichever arrives first. All mutation happens inside
//! that loop, so no lock guards the statistics.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::task::{Id, JoinError, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::config::ReplicatorConfig;
use super::state::RunState;
use super::timer::AdmissionTimer;
use crate::error::ReplicatorError;
use crate::job::{Job, JobContext, JobError, JobResult};
use crate::stats::{RunReport, RunningStats};

/// Hook invoked by the loop once per admission tick, before dispatch
///
/// Observers own their state and report their own failures; a failed
/// observation never stops the run.
pub trait TickObserver: Send {
    fn on_tick(&mut self);
}

impl<F> TickObserver for F
where
    F: FnMut() + Send,
{
    fn on_tick(&mut self) {
        self()
    }
}

/// Concurrency slot accounting
///
/// Invariant: `0 <= active <= ceiling`.
#[derive(Debug)]
struct ActiveWorkers {
    ceiling: usize,
    active: usize,
    peak: usize,
    dispatched: u64,
}

impl ActiveWorkers {
    fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            active: 0,
            peak: 0,
            dispatched: 0,
        }
    }

    /// Claim a slot, returning the dispatch sequence number
    fn try_acquire(&mut self) -> Option<u64> {
        if self.active >= self.ceiling {
            return None;
        }
        self.active += 1;
        self.peak = self.peak.max(self.active);
        self.dispatched += 1;
        Some(self.dispatched)
    }

    fn release(&mut self) {
        debug_assert!(self.active > 0, "released more slots than acquired");
        self.active = self.active.saturating_sub(1);
    }
}

/// Jobs in flight, with the dispatch sequence of every task
///
/// The sequence map lets a task that panicked be reported under the
/// sequence it was dispatched with.
struct InFlight<O> {
    tasks: JoinSet<JobResult<O>>,
    sequences: HashMap<Id, u64>,
}

impl<O: Send + 'static> InFlight<O> {
    fn new() -> Self {
        Self {
            tasks: JoinSet::new(),
            sequences: HashMap::new(),
        }
    }

    fn spawn<F>(&mut self, sequence: u64, task: F)
    where
        F: std::future::Future<Output = JobResult<O>> + Send + 'static,
    {
        let id = self.tasks.spawn(task).id();
        self.sequences.insert(id, sequence);
    }

    /// Next finished job; `None` when nothing is in flight
    async fn join_next(&mut self) -> Option<JobResult<O>> {
        let joined = self.tasks.join_next_with_id().await?;
        Some(self.settle(joined))
    }

    fn settle(&mut self, joined: Result<(Id, JobResult<O>), JoinError>) -> JobResult<O> {
        match joined {
            Ok((id, result)) => {
                self.sequences.remove(&id);
                result
            }
            Err(err) => JobResult {
                sequence: self.sequences.remove(&err.id()).unwrap_or_default(),
                outcome: Err(JobError::from(err)),
                elapsed: Duration::ZERO,
            },
        }
    }

    fn len(&self) -> usize {
        self.tasks.len()
    }

    fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Stop tracking the remaining tasks; they finish on their own
    fn detach_all(&mut self) {
        self.tasks.detach_all();
        self.sequences.clear();
    }
}

/// Generic replicator engine
///
/// # Example
///
/// ```ignore
/// use troll_replicator::prelude::*;
///
/// let config = ReplicatorConfig::new("files")
///     .with_ceiling(4)
///     .with_tick_period(Duration::from_millis(500));
///
/// let mut replicator = Replicator::new(config, FileJob::new("/tmp", size, content))?;
///
/// let cancel = CancellationToken::new();
/// let report = replicator.run(cancel.clone()).await?;
/// println!("{report}");
/// ```
pub struct Replicator<J: Job> {
    config: ReplicatorConfig,
    job: Arc<J>,
    observer: Option<Box<dyn TickObserver>>,
    state: RunState,
}

impl<J: Job> Replicator<J> {
    /// Create a replicator for `job`, validating the configuration
    pub fn new(config: ReplicatorConfig, job: J) -> Result<Self, ReplicatorError> {
        config.validate()?;
        Ok(Self {
            config,
            job: Arc::new(job),
            observer: None,
            state: RunState::Idle,
        })
    }

    /// Attach a per-tick observer
    pub fn with_observer(mut self, observer: impl TickObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Configuration this replicator was built with
    pub fn config(&self) -> &ReplicatorConfig {
        &self.config
    }

    /// The job being dispatched
    pub fn job(&self) -> &J {
        &self.job
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "Replicator state change");
        self.state = next;
    }

    /// Run until `cancel` fires, then produce the final report
    #[instrument(skip_all, fields(name = %self.config.name, kind = J::KIND))]
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<RunReport, ReplicatorError> {
        if self.state != RunState::Idle {
            return Err(ReplicatorError::AlreadyStarted);
        }

        let started = Instant::now();
        let started_at = Utc::now();
        self.transition(RunState::Running);

        info!(
            ceiling = self.config.ceiling,
            tick_ms = self.config.tick_period.as_millis() as u64,
            jitter_ms = self.config.jitter.map(|j| j.as_millis() as u64),
            "Starting replicator"
        );

        let mut timer = AdmissionTimer::new(self.config.tick_period);
        let mut tasks: InFlight<J::Output> = InFlight::new();
        let mut workers = ActiveWorkers::new(self.config.ceiling);
        let mut stats = RunningStats::new();
        let job_cancel = cancel.child_token();

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!(in_flight = workers.active, "Cancellation received");
                    break;
                }

                Some(result) = tasks.join_next() => {
                    aggregate(&mut stats, result);
                    workers.release();
                }

                _ = timer.tick() => {
                    if let Some(observer) = self.observer.as_mut() {
                        observer.on_tick();
                    }

                    while let Some(sequence) = workers.try_acquire() {
                        self.dispatch(&mut tasks, sequence, &job_cancel);
                    }
                }
            }
        }

        self.transition(RunState::Stopping);
        job_cancel.cancel();

        let abandoned = match self.config.drain_timeout {
            Some(timeout) => {
                let deadline = tokio::time::sleep(timeout);
                tokio::pin!(deadline);

                while !tasks.is_empty() {
                    tokio::select! {
                        _ = &mut deadline => {
                            warn!(remaining = tasks.len(), "Drain timeout reached");
                            break;
                        }
                        Some(result) = tasks.join_next() => {
                            aggregate(&mut stats, result);
                            workers.release();
                        }
                    }
                }
                tasks.len() as u64
            }
            None => tasks.len() as u64,
        };

        // Late results are discarded; the tasks finish on their own.
        tasks.detach_all();

        let report = RunReport {
            name: self.config.name.clone(),
            kind: J::KIND.to_string(),
            started_at,
            run_time: started.elapsed(),
            ceiling: self.config.ceiling,
            dispatched: workers.dispatched,
            peak_active: workers.peak,
            abandoned,
            stats,
        };

        self.transition(RunState::Reported);
        info!(
            dispatched = report.dispatched,
            successes = report.stats.successes,
            errors = report.stats.errors,
            abandoned = report.abandoned,
            "Replicator stopped"
        );

        Ok(report)
    }

    fn dispatch(
        &self,
        tasks: &mut InFlight<J::Output>,
        sequence: u64,
        cancel: &CancellationToken,
    ) {
        let job = Arc::clone(&self.job);
        let input = job.next_input();
        let delay = self
            .config
            .jitter
            .filter(|bound| !bound.is_zero())
            .map(|bound| rand::thread_rng().gen_range(Duration::ZERO..bound));
        let ctx = JobContext::new(sequence, cancel.clone());

        tasks.spawn(sequence, async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();
            let outcome = job.execute(&ctx, input).await;

            JobResult {
                sequence,
                outcome,
                elapsed: start.elapsed(),
            }
        });
    }
}

fn aggregate<O: crate::job::Payload>(stats: &mut RunningStats, result: JobResult<O>) {
    match result.outcome {
        Ok(payload) => {
            info!(
                sequence = result.sequence,
                elapsed = ?result.elapsed,
                "{}",
                payload
            );
            stats.record_success(result.elapsed, &payload);
        }
        Err(error) => {
            warn!(sequence = result.sequence, %error, "Job failed");
            stats.record_failure();
        }
    }
}
