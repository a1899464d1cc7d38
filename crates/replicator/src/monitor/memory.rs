//! Process memory sampling via sysinfo

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};
use tracing::{info, warn};

use crate::engine::TickObserver;
use crate::error::SampleError;

/// Memory usage of the current process at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemorySnapshot {
    pub resident_bytes: u64,
    pub virtual_bytes: u64,
}

fn mib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

/// Tick observer that logs this process's memory footprint
pub struct MemoryMonitor {
    pid: Pid,
    system: System,
    last: Option<MemorySnapshot>,
}

impl std::fmt::Debug for MemoryMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryMonitor")
            .field("pid", &self.pid)
            .field("last", &self.last)
            .finish()
    }
}

impl Default for MemoryMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMonitor {
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::new().with_processes(ProcessRefreshKind::everything()),
        );
        Self {
            pid: Pid::from_u32(std::process::id()),
            system,
            last: None,
        }
    }

    /// Refresh and read the current process
    pub fn sample(&mut self) -> Result<MemorySnapshot, SampleError> {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            ProcessRefreshKind::everything(),
        );

        let process = self
            .system
            .process(self.pid)
            .ok_or(SampleError::ProcessMissing(self.pid.as_u32()))?;

        let snapshot = MemorySnapshot {
            resident_bytes: process.memory(),
            virtual_bytes: process.virtual_memory(),
        };
        self.last = Some(snapshot);
        Ok(snapshot)
    }

    /// Most recent successful sample
    pub fn last(&self) -> Option<MemorySnapshot> {
        self.last
    }
}

impl TickObserver for MemoryMonitor {
    fn on_tick(&mut self) {
        match self.sample() {
            Ok(snapshot) => info!(
                resident_bytes = snapshot.resident_bytes,
                virtual_bytes = snapshot.virtual_bytes,
                "Memory Report: resident {:.1} MiB, virtual {:.1} MiB",
                mib(snapshot.resident_bytes),
                mib(snapshot.virtual_bytes)
            ),
            Err(e) => warn!(error = %e, "Skipping memory sample"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_current_process() {
        let mut monitor = MemoryMonitor::new();
        assert!(monitor.last().is_none());

        let snapshot = monitor.sample().unwrap();
        assert!(snapshot.resident_bytes > 0);
        assert_eq!(monitor.last(), Some(snapshot));
    }

    #[test]
    fn test_on_tick_records_sample() {
        let mut monitor = MemoryMonitor::new();
        monitor.on_tick();
        assert!(monitor.last().is_some());
    }

    #[test]
    fn test_mib() {
        assert_eq!(mib(3 * 1024 * 1024), 3.0);
    }
}
