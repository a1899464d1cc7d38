//! Job abstraction
//!
//! A [`Job`] is the domain-supplied body the replicator dispatches. It
//! builds one input per dispatch and turns it into a [`Payload`] or a
//! [`JobError`].

mod context;
mod definition;

pub use context::JobContext;
pub use definition::{Job, JobError, JobResult, Payload};
