//! Upstream relay client configuration

use std::time::Duration;

/// Configuration for an [`UpstreamRelayClient`](super::UpstreamRelayClient)
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Streaming endpoint of the ingest tier
    pub upstream_url: String,

    /// First reconnect delay
    pub min_backoff: Duration,

    /// Reconnect delay ceiling
    pub max_backoff: Duration,

    /// TCP connect timeout for each attempt
    pub connect_timeout: Duration,

    /// A connected upstream silent for this long is treated as lost
    pub idle_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            upstream_url: "http://127.0.0.1:3000/price-updates".into(),
            min_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(30),
        }
    }
}

impl RelayConfig {
    /// Create a config for the given upstream URL
    pub fn new(upstream_url: impl Into<String>) -> Self {
        Self {
            upstream_url: upstream_url.into(),
            ..Default::default()
        }
    }

    /// Set the reconnect delay range; `max` is raised to `min` if lower
    pub fn backoff(mut self, min: Duration, max: Duration) -> Self {
        self.min_backoff = min;
        self.max_backoff = max.max(min);
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the idle timeout
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }
}
