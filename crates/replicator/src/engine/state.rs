//! Replicator lifecycle state

use std::fmt;

use serde::{Deserialize, Serialize};

/// Replicator lifecycle
///
/// `Idle → Running → Stopping → Reported`; `Reported` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Created, not yet started
    Idle,
    /// Dispatching and aggregating
    Running,
    /// Cancelled; draining or discarding in-flight results
    Stopping,
    /// Final report produced
    Reported,
}

impl RunState {
    /// Whether `next` is a legal transition from this state
    pub fn can_transition_to(self, next: RunState) -> bool {
        matches!(
            (self, next),
            (RunState::Idle, RunState::Running)
                | (RunState::Running, RunState::Stopping)
                | (RunState::Stopping, RunState::Reported)
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Stopping => "stopping",
            RunState::Reported => "reported",
        };
        f.write_str(name)
    }
}
