//! Client registry implementation
//!
//! Bookkeeping for the subscribers of one hub. All access goes through a
//! single mutex, so a register or unregister can never interleave with an
//! in-flight delivery pass.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::entry::{Delivery, DeliverySink, Subscriber};
use super::frame::{PriceTick, SubscriberId};

/// Result of one delivery pass over the registry
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Subscribers that accepted the tick
    pub delivered: usize,
    /// Subscribers removed because delivery failed
    pub evicted: Vec<(SubscriberId, Delivery)>,
}

/// Set of live subscribers keyed by id
pub struct ClientRegistry {
    clients: Mutex<HashMap<SubscriberId, Subscriber>>,
    next_id: AtomicU64,
}

impl ClientRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate a fresh id for `sink` and insert it
    pub fn register(&self, sink: Arc<dyn DeliverySink>) -> Subscriber {
        self.register_with(sink, || None).0
    }

    /// Register `sink`, first pushing the value produced by `initial`
    ///
    /// `initial` runs under the registry lock, so no broadcast can reach the
    /// new subscriber before it, and no broadcast that completed earlier is
    /// newer than it. If the initial push fails the subscriber is not
    /// inserted and the failed outcome is returned alongside it.
    pub fn register_with<F>(&self, sink: Arc<dyn DeliverySink>, initial: F) -> (Subscriber, Delivery)
    where
        F: FnOnce() -> Option<PriceTick>,
    {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscriber = Subscriber::new(id, sink);

        let mut clients = self.clients.lock();
        let outcome = match initial() {
            Some(tick) => subscriber.deliver(&tick),
            None => Delivery::Delivered,
        };
        if outcome.is_delivered() {
            clients.insert(id, subscriber.clone());
        }

        (subscriber, outcome)
    }

    /// Remove a subscriber; absent ids are ignored
    ///
    /// Returns whether an entry was removed.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        self.clients.lock().remove(&id).is_some()
    }

    /// Whether `id` is currently registered
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.clients.lock().contains_key(&id)
    }

    /// Number of registered subscribers
    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    /// Whether no subscriber is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push `tick` to every subscriber, removing those whose delivery fails
    pub(crate) fn deliver_all(&self, tick: &PriceTick) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        self.clients.lock().retain(|id, subscriber| match subscriber.deliver(tick) {
            Delivery::Delivered => {
                report.delivered += 1;
                true
            }
            failed => {
                report.evicted.push((*id, failed));
                false
            }
        });

        report
    }

    /// Remove every subscriber, returning how many were removed
    pub(crate) fn drain(&self) -> usize {
        let mut clients = self.clients.lock();
        let count = clients.len();
        clients.clear();
        count
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}
