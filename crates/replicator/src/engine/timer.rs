//! Admission timer

use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Periodic wakeup source for dispatch decisions
///
/// The first tick fires one period after creation. Late ticks are delayed
/// rather than bursted, so a busy loop sees at most one tick per period.
#[derive(Debug)]
pub struct AdmissionTimer {
    interval: Interval,
}

impl AdmissionTimer {
    pub fn new(period: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    /// Configured period
    pub fn period(&self) -> Duration {
        self.interval.period()
    }

    /// Wait for the next tick
    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }
}
