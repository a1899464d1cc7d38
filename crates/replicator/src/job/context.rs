//! Job execution context

use tokio_util::sync::CancellationToken;

/// Context provided to a job while it executes
///
/// Carries the dispatch sequence number and the run's cancellation token.
/// Long-running jobs check `is_cancelled` between units of work.
#[derive(Debug, Clone)]
pub struct JobContext {
    /// Dispatch sequence number (1-based)
    pub sequence: u64,

    cancel: CancellationToken,
}

impl JobContext {
    /// Create a new job context
    pub fn new(sequence: u64, cancel: CancellationToken) -> Self {
        Self { sequence, cancel }
    }

    /// Check if the run has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait until the run is cancelled
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Token for handing cancellation to blocking threads
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}
