//! # Troll Replicator
//!
//! A bounded-concurrency, tick-driven engine that keeps a host under
//! synthetic load. One generic [`Replicator`] drives every resource domain;
//! each domain supplies a [`Job`] that produces one input per dispatch and
//! turns it into a result.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Replicator<J: Job>                       │
//! │  (admission tick, concurrency ceiling, shutdown and drain)  │
//! └─────────────────────────────────────────────────────────────┘
//!              │ dispatch                       ▲ JobResult
//!              ▼                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Domain jobs                           │
//! │     FileJob / FillJob / NetworkJob / BurnJob / MemoryJob    │
//! └─────────────────────────────────────────────────────────────┘
//!              │ on every tick
//!              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Monitors (TickObserver)                      │
//! │            CpuMonitor (/proc/stat), MemoryMonitor           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use troll_replicator::prelude::*;
//! use troll_replicator::jobs::{ContentPolicy, FileJob, SizePolicy};
//!
//! let job = FileJob::new("/tmp", SizePolicy::Random { max: 512 }, ContentPolicy::Random);
//! let config = ReplicatorConfig::new("files")
//!     .with_ceiling(4)
//!     .with_tick_period(Duration::from_millis(100));
//!
//! let cancel = CancellationToken::new();
//! let report = Replicator::new(config, job)?.run(cancel).await?;
//! println!("{}", report);
//! ```

pub mod engine;
pub mod error;
pub mod job;
pub mod jobs;
pub mod monitor;
pub mod size;
pub mod stats;

mod serde_duration;

/// Prelude for common imports
pub mod prelude {
    pub use crate::engine::{Replicator, ReplicatorConfig, RunState, TickObserver};
    pub use crate::error::{ConfigError, ReplicatorError, SampleError};
    pub use crate::job::{Job, JobContext, JobError, JobResult, Payload};
    pub use crate::stats::{DomainCounters, RunReport, RunningStats};
    pub use async_trait::async_trait;
    pub use std::time::Duration;
    pub use tokio_util::sync::CancellationToken;
}

// Re-export key types at crate root
pub use engine::{AdmissionTimer, Replicator, ReplicatorConfig, RunState, TickObserver};
pub use error::{ConfigError, ReplicatorError, SampleError};
pub use job::{Job, JobContext, JobError, JobResult, Payload};
pub use size::parse_size;
pub use stats::{DomainCounters, RunReport, RunningStats};
