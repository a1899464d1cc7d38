//! CPU utilization sampling from `/proc/stat`

use std::fmt::Write as _;
use std::path::PathBuf;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::engine::TickObserver;
use crate::error::SampleError;

const PROC_STAT: &str = "/proc/stat";

/// Cumulative tick counters for one CPU line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuTimes {
    /// `all` for the aggregate line, otherwise the CPU index
    pub label: String,
    pub idle: u64,
    pub total: u64,
}

/// One reading of every CPU line
#[derive(Debug, Clone)]
pub struct CpuSample {
    pub cpus: Vec<CpuTimes>,
    pub taken_at: Instant,
}

/// Utilization of one CPU between two samples
#[derive(Debug, Clone, PartialEq)]
pub struct CpuUsage {
    pub label: String,
    pub percent: f64,
}

fn cpu_label(field: &str) -> Option<String> {
    let suffix = field.strip_prefix("cpu")?;
    if suffix.is_empty() {
        Some("all".to_string())
    } else if suffix.bytes().all(|b| b.is_ascii_digit()) {
        Some(suffix.to_string())
    } else {
        None
    }
}

/// Parse the contents of `/proc/stat`
///
/// Every `cpu`/`cpuN` line contributes one entry: `total` is the sum of its
/// counters and `idle` is the fourth counter.
pub fn parse_proc_stat(contents: &str) -> Result<CpuSample, SampleError> {
    let mut cpus = Vec::new();

    for line in contents.lines() {
        let mut fields = line.split_whitespace();
        let Some(label) = fields.next().and_then(cpu_label) else {
            continue;
        };

        let mut idle = None;
        let mut total = 0u64;
        for (index, field) in fields.enumerate() {
            let value: u64 = field.parse().map_err(|_| {
                SampleError::Malformed(format!("cpu {} has non-numeric field '{}'", label, field))
            })?;
            total = total.saturating_add(value);
            if index == 3 {
                idle = Some(value);
            }
        }

        let idle = idle.ok_or_else(|| {
            SampleError::Malformed(format!("cpu {} has fewer than four counters", label))
        })?;
        cpus.push(CpuTimes { label, idle, total });
    }

    if cpus.is_empty() {
        return Err(SampleError::Malformed("no cpu lines found".to_string()));
    }

    Ok(CpuSample {
        cpus,
        taken_at: Instant::now(),
    })
}

/// Per-CPU utilization between two consecutive samples
///
/// `percent = 100 * (Δtotal - Δidle) / Δtotal`, and 0 when no ticks elapsed.
pub fn utilization(previous: &CpuSample, latest: &CpuSample) -> Result<Vec<CpuUsage>, SampleError> {
    if previous.cpus.len() != latest.cpus.len() {
        return Err(SampleError::Mismatch {
            previous: previous.cpus.len(),
            latest: latest.cpus.len(),
        });
    }

    Ok(previous
        .cpus
        .iter()
        .zip(&latest.cpus)
        .map(|(before, after)| {
            let total = after.total.saturating_sub(before.total) as f64;
            let idle = after.idle.saturating_sub(before.idle) as f64;
            let percent = if total > 0.0 {
                (100.0 * (total - idle) / total).clamp(0.0, 100.0)
            } else {
                0.0
            };
            CpuUsage {
                label: after.label.clone(),
                percent,
            }
        })
        .collect())
}

/// Tick observer that logs CPU utilization since the previous tick
#[derive(Debug)]
pub struct CpuMonitor {
    source: PathBuf,
    last: Option<CpuSample>,
}

impl Default for CpuMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuMonitor {
    pub fn new() -> Self {
        Self::with_source(PROC_STAT)
    }

    /// Read samples from another file (used by tests)
    pub fn with_source(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            last: None,
        }
    }

    /// Take a sample and compute usage against the previous one
    ///
    /// Returns `Ok(None)` for the first sample. On error the previous
    /// sample is kept so the next tick can still compute a delta.
    pub fn observe(&mut self) -> Result<Option<Vec<CpuUsage>>, SampleError> {
        // Blocking read inside the loop; /proc/stat is kernel-generated and
        // never waits on a disk.
        let contents = std::fs::read_to_string(&self.source).map_err(|source| SampleError::Read {
            path: self.source.clone(),
            source,
        })?;
        let sample = parse_proc_stat(&contents)?;

        let usage = match &self.last {
            Some(previous) => Some(utilization(previous, &sample)?),
            None => None,
        };
        self.last = Some(sample);
        Ok(usage)
    }
}

fn format_usage(usage: &[CpuUsage]) -> String {
    let mut report = String::from("CPU Report:");
    for cpu in usage {
        let _ = write!(report, "\n\tCPU {}: {:.1}%", cpu.label, cpu.percent);
    }
    report
}

impl TickObserver for CpuMonitor {
    fn on_tick(&mut self) {
        match self.observe() {
            Ok(Some(usage)) => info!("{}", format_usage(&usage)),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Skipping CPU sample"),
        }
    }
}
