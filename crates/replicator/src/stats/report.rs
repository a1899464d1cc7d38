//! Final run report
//!
//! Produced once the replicator reaches the reported state. Rendered as a
//! human-readable block via `Display`, or as JSON for scripting.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RunningStats;
use crate::serde_duration::millis;

const NO_DATA: &str = "no data";

/// Finalized statistics of one replicator run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunReport {
    /// Run name
    pub name: String,
    /// Job kind that was dispatched
    pub kind: String,
    /// Wall-clock start of the run
    pub started_at: DateTime<Utc>,
    /// Total wall-clock run time
    #[serde(rename = "run_time_ms", with = "millis")]
    pub run_time: Duration,
    /// Configured concurrency ceiling
    pub ceiling: usize,
    /// Jobs dispatched over the run
    pub dispatched: u64,
    /// Highest observed number of concurrently active jobs
    pub peak_active: usize,
    /// In-flight jobs whose results were discarded at shutdown
    pub abandoned: u64,
    /// Aggregated job statistics
    pub stats: RunningStats,
}

impl RunReport {
    /// Total calls: successes plus errors
    pub fn total_calls(&self) -> u64 {
        self.stats.completed()
    }

    /// Render as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn or_no_data(value: Option<Duration>) -> String {
    value.map_or_else(|| NO_DATA.to_string(), |d| format!("{:?}", d))
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.stats;
        let counters = &stats.counters;

        writeln!(f, "Final Stats ({}, {}):", self.name, self.kind)?;
        writeln!(f, "  Total Run Duration:  {:?}", self.run_time)?;
        writeln!(f, "  Time Spent In Jobs:  {:?}", stats.cumulative)?;
        writeln!(f, "  Max Concurrency:     {}", self.ceiling)?;
        writeln!(f, "  Peak Concurrency:    {}", self.peak_active)?;
        writeln!(
            f,
            "  Total Calls:         {} ({} successful, {} errors)",
            self.total_calls(),
            stats.successes,
            stats.errors
        )?;
        if self.abandoned > 0 {
            writeln!(f, "  Abandoned In Flight: {}", self.abandoned)?;
        }
        writeln!(f, "  Avg Job Time:        {}", or_no_data(stats.average()))?;
        writeln!(f, "  Shortest Job Time:   {}", or_no_data(stats.shortest))?;
        writeln!(f, "  Longest Job Time:    {}", or_no_data(stats.longest))?;

        if counters.bytes_written > 0 || counters.bytes_read > 0 {
            writeln!(
                f,
                "  Bytes Written:       {} (read {})",
                counters.bytes_written, counters.bytes_read
            )?;
        }

        if !counters.status_codes.is_empty() {
            writeln!(f, "  HTTP Code Stats:")?;
            for (status, count) in &counters.status_codes {
                writeln!(f, "    {}:\t{}", status, count)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(stats: RunningStats) -> RunReport {
        RunReport {
            name: "test".to_string(),
            kind: "synthetic".to_string(),
            started_at: Utc::now(),
            run_time: Duration::from_millis(1500),
            ceiling: 4,
            dispatched: stats.completed(),
            peak_active: 4,
            abandoned: 0,
            stats,
        }
    }

    #[test]
    fn test_zero_successes_print_no_data() {
        let mut stats = RunningStats::new();
        stats.record_failure();
        stats.record_failure();

        let text = report(stats).to_string();

        assert!(text.contains("Total Calls:         2 (0 successful, 2 errors)"));
        assert!(text.contains("Avg Job Time:        no data"));
        assert!(text.contains("Shortest Job Time:   no data"));
        assert!(text.contains("Longest Job Time:    no data"));
        assert!(!text.contains("18446744073709551615"));
    }

    #[test]
    fn test_status_codes_sorted() {
        let mut stats = RunningStats::new();
        stats.counters.record_status(503);
        stats.counters.record_status(200);
        stats.counters.record_status(404);

        let text = report(stats).to_string();
        let ok = text.find("200:").unwrap();
        let missing = text.find("404:").unwrap();
        let unavailable = text.find("503:").unwrap();

        assert!(ok < missing && missing < unavailable);
    }

    #[test]
    fn test_bytes_line_only_when_counted() {
        let text = report(RunningStats::new()).to_string();
        assert!(!text.contains("Bytes Written"));

        let mut stats = RunningStats::new();
        stats.counters.add_written(2048);
        let text = report(stats).to_string();
        assert!(text.contains("Bytes Written:       2048 (read 0)"));
    }

    #[test]
    fn test_json_uses_null_for_missing_extremes() {
        let json = report(RunningStats::new()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["run_time_ms"], 1500);
        assert_eq!(value["ceiling"], 4);
        assert!(value["stats"]["shortest_micros"].is_null());
        assert!(value["stats"]["longest_micros"].is_null());
    }
}
