//! CPU burn job

use std::fmt;
use std::hint::black_box;

use async_trait::async_trait;

use crate::job::{Job, JobContext, JobError, Payload};

/// Iterations between cancellation checks
const DEFAULT_BATCH: u64 = 1 << 20;

/// Work done by one burn worker before it observed cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurnReport {
    pub iterations: u64,
}

impl fmt::Display for BurnReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "burned {} iterations", self.iterations)
    }
}

impl Payload for BurnReport {}

/// Keeps one blocking thread busy until the run is cancelled
///
/// The spin checks the cancellation token every `batch` iterations, so a
/// worker never outlives shutdown by more than one batch.
#[derive(Debug, Clone)]
pub struct BurnJob {
    batch: u64,
}

impl Default for BurnJob {
    fn default() -> Self {
        Self {
            batch: DEFAULT_BATCH,
        }
    }
}

impl BurnJob {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set iterations between cancellation checks
    pub fn with_batch(mut self, batch: u64) -> Self {
        self.batch = batch.max(1);
        self
    }
}

fn spin(batch: u64, seed: u64) -> u64 {
    let mut acc = seed;
    for i in 0..batch {
        acc = black_box(acc.wrapping_mul(6364136223846793005).wrapping_add(i));
    }
    acc
}

#[async_trait]
impl Job for BurnJob {
    const KIND: &'static str = "cpu";
    type Input = ();
    type Output = BurnReport;

    fn next_input(&self) -> Self::Input {}

    async fn execute(&self, ctx: &JobContext, _input: ()) -> Result<BurnReport, JobError> {
        let token = ctx.token().clone();
        let batch = self.batch;

        let iterations = tokio::task::spawn_blocking(move || {
            let mut iterations = 0u64;
            let mut acc = 1u64;
            while !token.is_cancelled() {
                acc = spin(batch, acc);
                iterations = iterations.saturating_add(batch);
            }
            black_box(acc);
            iterations
        })
        .await?;

        Ok(BurnReport { iterations })
    }
}
