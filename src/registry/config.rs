//! Registry configuration

/// Configuration for a [`BroadcastHub`](super::BroadcastHub) and its registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Ticks that may queue for one subscriber before it is evicted as lagging
    pub subscriber_buffer: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: 64,
        }
    }
}

impl RegistryConfig {
    /// Set the per-subscriber queue size (minimum 1)
    pub fn subscriber_buffer(mut self, size: usize) -> Self {
        self.subscriber_buffer = size.max(1);
        self
    }
}
