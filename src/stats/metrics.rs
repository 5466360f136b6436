//! Statistics for hubs and relay links

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Live counters for one broadcast hub
#[derive(Debug)]
pub struct HubStats {
    started_at: Instant,
    peak_clients: AtomicUsize,
    ticks_broadcast: AtomicU64,
    deliveries: AtomicU64,
    evictions: AtomicU64,
}

impl HubStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            peak_clients: AtomicUsize::new(0),
            ticks_broadcast: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Record the registry size after a subscriber joined
    pub fn record_clients(&self, current: usize) {
        self.peak_clients.fetch_max(current, Ordering::Relaxed);
    }

    /// Record one broadcast pass
    pub fn record_broadcast(&self, delivered: usize, evicted: usize) {
        self.ticks_broadcast.fetch_add(1, Ordering::Relaxed);
        self.deliveries.fetch_add(delivered as u64, Ordering::Relaxed);
        self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
    }

    /// Record one delivery outside a broadcast (the send at connect time)
    pub fn record_delivery(&self) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a subscriber removed after a failed delivery
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Time since the hub was created
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Point-in-time copy, given the current registry size
    pub fn snapshot(&self, connected_clients: usize) -> HubSnapshot {
        HubSnapshot {
            connected_clients,
            peak_clients: self.peak_clients.load(Ordering::Relaxed),
            ticks_broadcast: self.ticks_broadcast.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            uptime_secs: self.uptime().as_secs(),
        }
    }
}

impl Default for HubStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable view of [`HubStats`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubSnapshot {
    pub connected_clients: usize,
    pub peak_clients: usize,
    pub ticks_broadcast: u64,
    pub deliveries: u64,
    pub evictions: u64,
    pub uptime_secs: u64,
}

/// Live counters for the upstream link of a relay tier
#[derive(Debug, Default)]
pub struct RelayStats {
    connected: AtomicBool,
    ticks_received: AtomicU64,
    connect_attempts: AtomicU64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attempt(&self) {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn record_tick(&self) {
        self.ticks_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> RelaySnapshot {
        RelaySnapshot {
            connected: self.is_connected(),
            ticks_received: self.ticks_received.load(Ordering::Relaxed),
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
        }
    }
}

/// Serializable view of [`RelayStats`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelaySnapshot {
    pub connected: bool,
    pub ticks_received: u64,
    pub connect_attempts: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_stats_new() {
        let snapshot = HubStats::new().snapshot(0);
        assert_eq!(snapshot.connected_clients, 0);
        assert_eq!(snapshot.peak_clients, 0);
        assert_eq!(snapshot.ticks_broadcast, 0);
        assert_eq!(snapshot.deliveries, 0);
        assert_eq!(snapshot.evictions, 0);
    }

    #[test]
    fn test_hub_stats_counts() {
        let stats = HubStats::new();
        stats.record_clients(3);
        stats.record_clients(1);
        stats.record_broadcast(3, 0);
        stats.record_broadcast(2, 1);
        stats.record_delivery();

        let snapshot = stats.snapshot(2);
        assert_eq!(snapshot.connected_clients, 2);
        assert_eq!(snapshot.peak_clients, 3);
        assert_eq!(snapshot.ticks_broadcast, 2);
        assert_eq!(snapshot.deliveries, 6);
        assert_eq!(snapshot.evictions, 1);
    }

    #[test]
    fn test_hub_snapshot_json_is_camel_case() {
        let json = serde_json::to_value(HubStats::new().snapshot(4)).unwrap();
        assert_eq!(json["connectedClients"], 4);
        assert!(json.get("ticksBroadcast").is_some());
    }

    #[test]
    fn test_relay_stats() {
        let stats = RelayStats::new();
        stats.record_attempt();
        stats.record_attempt();
        stats.set_connected(true);
        stats.record_tick();

        let snapshot = stats.snapshot();
        assert!(snapshot.connected);
        assert_eq!(snapshot.connect_attempts, 2);
        assert_eq!(snapshot.ticks_received, 1);
    }
}
