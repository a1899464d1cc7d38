//! Run statistics
//!
//! [`RunningStats`] is updated by the aggregator as results arrive;
//! [`RunReport`] is the finalized snapshot formatted at shutdown.

mod report;
mod running;

pub use report::RunReport;
pub use running::{DomainCounters, RunningStats};
