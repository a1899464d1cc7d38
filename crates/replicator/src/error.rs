//! Error types shared across the engine, monitors and domain jobs

use std::path::PathBuf;

use thiserror::Error;

/// Startup errors: bad flags, unreadable inputs, invalid engine settings.
///
/// These are fatal and surface before the dispatch loop starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Concurrency ceiling must be at least one
    #[error("concurrency ceiling must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    /// Tick period must be non-zero
    #[error("tick period must be greater than zero")]
    InvalidTickPeriod,

    /// Size string could not be parsed
    #[error("invalid size '{input}': {reason}")]
    InvalidSize { input: String, reason: String },

    /// No usable targets were supplied
    #[error("empty target list, unable to continue")]
    EmptyTargets,

    /// URL file could not be read
    #[error("failed to read URL file {path}: {source}")]
    UrlFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Memory region could not be allocated
    #[error("failed to allocate {cells} memory cells: {reason}")]
    Allocation { cells: usize, reason: String },

    /// HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

impl ConfigError {
    pub(crate) fn invalid_size(input: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidSize {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure while taking one periodic system sample.
///
/// Logged by the monitor that hit it; the tick's sample is skipped.
#[derive(Debug, Error)]
pub enum SampleError {
    /// Source could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source was read but did not have the expected shape
    #[error("malformed sample: {0}")]
    Malformed(String),

    /// Two consecutive samples disagree on the number of CPUs
    #[error("sample mismatch: previous had {previous} cpus, latest has {latest}")]
    Mismatch { previous: usize, latest: usize },

    /// The current process was not visible to sysinfo
    #[error("process {0} not found")]
    ProcessMissing(u32),
}

/// Errors from driving a replicator
#[derive(Debug, Error)]
pub enum ReplicatorError {
    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// `run` was called on a replicator that already left the idle state
    #[error("replicator has already been started")]
    AlreadyStarted,
}
