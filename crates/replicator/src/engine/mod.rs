//! Replicator engine
//!
//! This module provides:
//! - [`Replicator`] - the generic dispatch-and-aggregate loop
//! - [`ReplicatorConfig`] - ceiling, tick period, jitter and drain settings
//! - [`AdmissionTimer`] - periodic dispatch trigger
//! - [`TickObserver`] - per-tick hook for monitors
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Replicator                             │
//! │                                                              │
//! │   select! { cancellation | job completion | admission tick } │
//! │         │                    │                  │            │
//! │         ▼                    ▼                  ▼            │
//! │     Stopping          Aggregator          Controller         │
//! │   (drain/discard)   (RunningStats,      (dispatch while      │
//! │         │            free a slot)        active < ceiling)   │
//! │         ▼                                       │            │
//! │     RunReport                                   ▼            │
//! │                              [Job 1] [Job 2] ... [Job N]     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod replicator;
mod state;
mod timer;

pub use config::ReplicatorConfig;
pub use replicator::{Replicator, TickObserver};
pub use state::RunState;
pub use timer::AdmissionTimer;
