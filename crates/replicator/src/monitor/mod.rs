//! Periodic system monitors
//!
//! Both monitors implement [`TickObserver`](crate::engine::TickObserver) and
//! are attached to a replicator with `with_observer`. A failed sample is
//! logged and skipped; it never stops the run.

mod cpu;
mod memory;

pub use cpu::{parse_proc_stat, utilization, CpuMonitor, CpuSample, CpuTimes, CpuUsage};
pub use memory::{MemoryMonitor, MemorySnapshot};
