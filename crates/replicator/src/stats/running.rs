//! Running statistics maintained by the aggregator

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::job::Payload;
use crate::serde_duration::{micros, option_micros};

/// Domain counters folded in from successful payloads
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainCounters {
    /// Total bytes written by jobs
    pub bytes_written: u64,
    /// Total bytes read by jobs
    pub bytes_read: u64,
    /// HTTP status code histogram
    pub status_codes: BTreeMap<u16, u64>,
}

impl DomainCounters {
    pub fn add_written(&mut self, bytes: u64) {
        self.bytes_written = self.bytes_written.saturating_add(bytes);
    }

    pub fn add_read(&mut self, bytes: u64) {
        self.bytes_read = self.bytes_read.saturating_add(bytes);
    }

    pub fn record_status(&mut self, status: u16) {
        *self.status_codes.entry(status).or_insert(0) += 1;
    }
}

/// Aggregate counters and timing extremes across a run
///
/// Only the aggregator mutates this. `shortest` and `longest` stay `None`
/// until the first success.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunningStats {
    /// Successful jobs
    pub successes: u64,
    /// Failed jobs
    pub errors: u64,
    /// Sum of successful job durations
    #[serde(rename = "cumulative_micros", with = "micros")]
    pub cumulative: Duration,
    /// Fastest successful job
    #[serde(rename = "shortest_micros", with = "option_micros")]
    pub shortest: Option<Duration>,
    /// Slowest successful job
    #[serde(rename = "longest_micros", with = "option_micros")]
    pub longest: Option<Duration>,
    /// Bytes and status codes
    pub counters: DomainCounters,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful job
    pub fn record_success<P: Payload>(&mut self, elapsed: Duration, payload: &P) {
        self.successes += 1;
        self.cumulative = self.cumulative.saturating_add(elapsed);
        self.shortest = Some(self.shortest.map_or(elapsed, |s| s.min(elapsed)));
        self.longest = Some(self.longest.map_or(elapsed, |l| l.max(elapsed)));
        payload.tally(&mut self.counters);
    }

    /// Record a failed job; timing statistics are untouched
    pub fn record_failure(&mut self) {
        self.errors += 1;
    }

    /// Completed jobs, successful or not
    pub fn completed(&self) -> u64 {
        self.successes + self.errors
    }

    /// Mean successful job duration, `None` without successes
    pub fn average(&self) -> Option<Duration> {
        if self.successes == 0 {
            return None;
        }
        let nanos = self.cumulative.as_nanos() / u128::from(self.successes);
        Some(Duration::from_nanos(nanos as u64))
    }
}
