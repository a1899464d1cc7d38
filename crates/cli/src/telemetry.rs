// Logging setup
//
// Design Decision: Logs go to stderr so the final report on stdout stays
// machine readable with `--output json`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "info";

/// Logging configuration
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    /// Log filter (e.g., "info", "debug", "troll_replicator=debug")
    pub log_filter: Option<String>,
}

impl TelemetryConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `RUST_LOG` or `LOG_LEVEL`: Log filter
    pub fn from_env() -> Self {
        Self {
            log_filter: std::env::var("RUST_LOG")
                .ok()
                .or_else(|| std::env::var("LOG_LEVEL").ok()),
        }
    }

    /// Resolve the filter, falling back to `info` when unset or invalid
    pub fn filter(&self) -> EnvFilter {
        self.log_filter
            .as_ref()
            .and_then(|f| EnvFilter::try_new(f).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Install the global subscriber
pub fn init_telemetry(config: TelemetryConfig) {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(config.filter());

    tracing_subscriber::registry().with(console_layer).init();
}
