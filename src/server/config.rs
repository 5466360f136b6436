//! Server configuration

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use crate::registry::RegistryConfig;
use crate::source::{PriceModel, UpdateSchedule};

/// Tier configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind to
    pub host: IpAddr,

    /// First port tried by the port binder
    pub port: u16,

    /// Last port tried before giving up
    pub max_port: u16,

    /// Ingest tier: when price updates happen
    pub update_schedule: UpdateSchedule,

    /// Artificial delay before each push to a subscriber (zero disables)
    pub network_latency: Duration,

    /// Public tier: interval at which the cached value is re-pushed
    pub push_interval: Duration,

    /// Interval of SSE keep-alive comments on idle streams
    pub keep_alive: Duration,

    /// Ingest tier: how new prices are produced
    pub price_model: PriceModel,

    /// Subscriber registry settings
    pub registry: RegistryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            max_port: u16::MAX,
            update_schedule: UpdateSchedule::default(),
            network_latency: Duration::ZERO,
            push_interval: Duration::from_millis(100),
            keep_alive: Duration::from_secs(15),
            price_model: PriceModel::Uniform,
            registry: RegistryConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config starting the port scan at `port`
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Set the interface to bind to
    pub fn host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// Set the first port to try
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the last port to try
    pub fn max_port(mut self, port: u16) -> Self {
        self.max_port = port;
        self
    }

    /// Update the price on a fixed interval (minimum 1ms)
    pub fn update_interval(mut self, interval: Duration) -> Self {
        self.update_schedule = UpdateSchedule::Fixed(interval.max(Duration::from_millis(1)));
        self
    }

    /// Update the price after a random delay in `[min, max]` each time
    pub fn update_jitter(mut self, min: Duration, max: Duration) -> Self {
        self.update_schedule = UpdateSchedule::jittered(min, max);
        self
    }

    /// Set the update schedule
    pub fn update_schedule(mut self, schedule: UpdateSchedule) -> Self {
        self.update_schedule = schedule;
        self
    }

    /// Set the emulated network latency
    pub fn network_latency(mut self, latency: Duration) -> Self {
        self.network_latency = latency;
        self
    }

    /// Set the public tier push interval (minimum 1ms)
    pub fn push_interval(mut self, interval: Duration) -> Self {
        self.push_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Set the keep-alive comment interval
    pub fn keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = interval;
        self
    }

    /// Set the price model
    pub fn price_model(mut self, model: PriceModel) -> Self {
        self.price_model = model;
        self
    }

    /// Set the registry configuration
    pub fn registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = registry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert!(config.host.is_unspecified());
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_port, u16::MAX);
        assert_eq!(
            config.update_schedule,
            UpdateSchedule::Fixed(Duration::from_millis(100))
        );
        assert_eq!(config.network_latency, Duration::ZERO);
        assert_eq!(config.price_model, PriceModel::Uniform);
    }

    #[test]
    fn test_with_port() {
        let config = ServerConfig::with_port(3001);
        assert_eq!(config.port, 3001);
    }

    #[test]
    fn test_intervals_have_a_floor() {
        let config = ServerConfig::default()
            .update_interval(Duration::ZERO)
            .push_interval(Duration::ZERO);

        assert_eq!(
            config.update_schedule,
            UpdateSchedule::Fixed(Duration::from_millis(1))
        );
        assert_eq!(config.push_interval, Duration::from_millis(1));
    }

    #[test]
    fn test_builder_chaining() {
        let config = ServerConfig::default()
            .host(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .port(4000)
            .max_port(4010)
            .network_latency(Duration::from_millis(20))
            .keep_alive(Duration::from_secs(5))
            .price_model(PriceModel::RandomWalk)
            .registry(RegistryConfig::default().subscriber_buffer(8));

        assert!(config.host.is_loopback());
        assert_eq!(config.port, 4000);
        assert_eq!(config.max_port, 4010);
        assert_eq!(config.network_latency, Duration::from_millis(20));
        assert_eq!(config.keep_alive, Duration::from_secs(5));
        assert_eq!(config.price_model, PriceModel::RandomWalk);
        assert_eq!(config.registry.subscriber_buffer, 8);
    }

    #[test]
    fn test_update_jitter_replaces_interval() {
        let config = ServerConfig::default()
            .update_interval(Duration::from_millis(250))
            .update_jitter(Duration::from_millis(100), Duration::from_millis(3000));

        assert_eq!(
            config.update_schedule,
            UpdateSchedule::Jittered {
                min: Duration::from_millis(100),
                max: Duration::from_millis(3000),
            }
        );
    }
}
