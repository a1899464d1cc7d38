//! Replicator configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::serde_duration::{millis, option_millis};

/// Replicator configuration
///
/// Immutable once a run starts. Domain parameters (sizes, targets) live on
/// the job itself.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use troll_replicator::ReplicatorConfig;
///
/// let config = ReplicatorConfig::new("files")
///     .with_ceiling(8)
///     .with_tick_period(Duration::from_millis(250));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplicatorConfig {
    /// Name used in logs and the final report
    pub name: String,

    /// Maximum concurrently running jobs
    pub ceiling: usize,

    /// Admission tick period
    #[serde(rename = "tick_period_ms", with = "millis")]
    pub tick_period: Duration,

    /// Upper bound (exclusive) of the random delay before each job
    #[serde(rename = "jitter_ms", with = "option_millis")]
    pub jitter: Option<Duration>,

    /// How long to wait for in-flight results after cancellation
    ///
    /// `None` exits immediately and discards late results.
    #[serde(rename = "drain_timeout_ms", with = "option_millis")]
    pub drain_timeout: Option<Duration>,
}

impl Default for ReplicatorConfig {
    fn default() -> Self {
        Self {
            name: "replicator".to_string(),
            ceiling: 1,
            tick_period: Duration::from_millis(1000),
            jitter: None,
            drain_timeout: None,
        }
    }
}

impl ReplicatorConfig {
    /// Create a configuration with defaults and the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the concurrency ceiling
    pub fn with_ceiling(mut self, ceiling: usize) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// Set the admission tick period
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Set the jitter bound (zero disables jitter)
    pub fn with_jitter(mut self, bound: Duration) -> Self {
        self.jitter = (!bound.is_zero()).then_some(bound);
        self
    }

    /// Drain in-flight results for up to `timeout` on shutdown
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = Some(timeout);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ceiling == 0 {
            return Err(ConfigError::InvalidConcurrency(self.ceiling));
        }
        if self.tick_period.is_zero() {
            return Err(ConfigError::InvalidTickPeriod);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReplicatorConfig::default();
        assert_eq!(config.ceiling, 1);
        assert_eq!(config.tick_period, Duration::from_secs(1));
        assert_eq!(config.jitter, None);
        assert_eq!(config.drain_timeout, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ReplicatorConfig::new("network")
            .with_ceiling(20)
            .with_tick_period(Duration::from_millis(50))
            .with_jitter(Duration::from_millis(300))
            .with_drain_timeout(Duration::from_secs(2));

        assert_eq!(config.name, "network");
        assert_eq!(config.ceiling, 20);
        assert_eq!(config.tick_period, Duration::from_millis(50));
        assert_eq!(config.jitter, Some(Duration::from_millis(300)));
        assert_eq!(config.drain_timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_zero_jitter_disables() {
        let config = ReplicatorConfig::default().with_jitter(Duration::ZERO);
        assert_eq!(config.jitter, None);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero_ceiling = ReplicatorConfig::default().with_ceiling(0);
        assert!(matches!(
            zero_ceiling.validate(),
            Err(ConfigError::InvalidConcurrency(0))
        ));

        let zero_tick = ReplicatorConfig::default().with_tick_period(Duration::ZERO);
        assert!(matches!(
            zero_tick.validate(),
            Err(ConfigError::InvalidTickPeriod)
        ));
    }

    #[test]
    fn test_config_serialization() {
        let config = ReplicatorConfig::new("mem").with_jitter(Duration::from_millis(5));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["tick_period_ms"], 1000);
        assert_eq!(json["jitter_ms"], 5);
        assert!(json["drain_timeout_ms"].is_null());

        let parsed: ReplicatorConfig = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, config);
    }
}
