//! Broadcast hub
//!
//! Owns one [`ClientRegistry`] and fans each tick out to every subscriber in
//! it. Subscribers whose delivery fails are evicted during the same pass;
//! the failure never reaches other subscribers or the caller.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::stats::{HubSnapshot, HubStats};

use super::config::RegistryConfig;
use super::entry::{ChannelSink, Delivery, DeliverySink, Subscriber};
use super::frame::{PriceTick, SubscriberId};
use super::store::ClientRegistry;

/// Fan-out point for one tier
pub struct BroadcastHub {
    registry: ClientRegistry,
    config: RegistryConfig,
    stats: HubStats,
    closed: AtomicBool,
}

impl BroadcastHub {
    /// Create a hub with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a hub with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            registry: ClientRegistry::new(),
            config,
            stats: HubStats::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Get the hub configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Open a subscription that receives every subsequent broadcast
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        self.subscribe_with(|| None)
    }

    /// Open a subscription whose first item is the value produced by `current`
    ///
    /// `current` is evaluated atomically with registration, so the first item
    /// is never older than a broadcast the subscriber misses.
    pub fn subscribe_with<F>(self: &Arc<Self>, current: F) -> Subscription
    where
        F: FnOnce() -> Option<PriceTick>,
    {
        let (sink, rx) = ChannelSink::new(self.config.subscriber_buffer);
        let subscriber = self.register_with(Arc::new(sink), current);

        Subscription {
            id: subscriber.map(|s| s.id),
            rx,
            hub: Arc::downgrade(self),
        }
    }

    /// Register an arbitrary sink
    ///
    /// Returns `None` if the hub is closed. The caller is responsible for
    /// calling [`unregister`](Self::unregister) when its transport closes.
    pub fn register(&self, sink: Arc<dyn DeliverySink>) -> Option<Subscriber> {
        self.register_with(sink, || None)
    }

    fn register_with<F>(&self, sink: Arc<dyn DeliverySink>, current: F) -> Option<Subscriber>
    where
        F: FnOnce() -> Option<PriceTick>,
    {
        if self.is_closed() {
            return None;
        }

        let mut sent_initial = false;
        let (subscriber, outcome) = self.registry.register_with(sink, || {
            let tick = current();
            sent_initial = tick.is_some();
            tick
        });

        if !outcome.is_delivered() {
            self.stats.record_eviction();
            tracing::warn!(
                subscriber_id = %subscriber.id,
                outcome = ?outcome,
                "Initial delivery failed, subscriber not registered"
            );
            return None;
        }
        if sent_initial {
            self.stats.record_delivery();
        }

        // close() may have drained the registry between the check and insert
        if self.is_closed() {
            self.registry.unregister(subscriber.id);
            return None;
        }

        let clients = self.registry.len();
        self.stats.record_clients(clients);
        tracing::info!(
            subscriber_id = %subscriber.id,
            clients = clients,
            "Client connected"
        );

        Some(subscriber)
    }

    /// Remove a subscriber; unknown or already removed ids are ignored
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let removed = self.registry.unregister(id);
        if removed {
            tracing::info!(
                subscriber_id = %id,
                clients = self.registry.len(),
                "Client disconnected"
            );
        }
        removed
    }

    /// Deliver `tick` to every registered subscriber
    ///
    /// Returns the number of subscribers that accepted it. Subscribers whose
    /// delivery failed are unregistered before this returns.
    pub fn broadcast(&self, tick: &PriceTick) -> usize {
        let report = self.registry.deliver_all(tick);

        for (id, outcome) in &report.evicted {
            match outcome {
                Delivery::Closed => {
                    tracing::debug!(subscriber_id = %id, "Transport closed, subscriber removed")
                }
                Delivery::Failed(e) => {
                    tracing::warn!(subscriber_id = %id, error = %e, "Delivery failed, subscriber removed")
                }
                Delivery::Delivered => {}
            }
        }

        self.stats
            .record_broadcast(report.delivered, report.evicted.len());

        tracing::debug!(
            price = %tick,
            delivered = report.delivered,
            evicted = report.evicted.len(),
            "Broadcast tick"
        );

        report.delivered
    }

    /// Number of registered subscribers
    pub fn client_count(&self) -> usize {
        self.registry.len()
    }

    /// Whether `id` is still registered
    pub fn is_registered(&self, id: SubscriberId) -> bool {
        self.registry.contains(id)
    }

    /// Counter snapshot for observability endpoints
    pub fn snapshot(&self) -> HubSnapshot {
        self.stats.snapshot(self.registry.len())
    }

    /// Unregister everyone and refuse new subscribers
    ///
    /// Every open [`Subscription`] ends once its queued ticks are drained.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let removed = self.registry.drain();
        tracing::info!(clients = removed, "Hub closed");
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscriber's view of a hub, as a stream of ticks
///
/// Dropping the subscription unregisters it. The stream ends when the hub
/// evicts the subscriber or is closed.
pub struct Subscription {
    id: Option<SubscriberId>,
    rx: mpsc::Receiver<PriceTick>,
    hub: Weak<BroadcastHub>,
}

impl Subscription {
    /// Registry id, or `None` if the hub refused the subscription
    pub fn id(&self) -> Option<SubscriberId> {
        self.id
    }
}

impl Stream for Subscription {
    type Item = PriceTick;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let (Some(id), Some(hub)) = (self.id, self.hub.upgrade()) {
            hub.unregister(id);
        }
    }
}
