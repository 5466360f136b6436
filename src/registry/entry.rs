//! Subscriber entries and delivery sinks
//!
//! A [`Subscriber`] pairs an id with a [`DeliverySink`], the capability used
//! to push one tick to the connection behind it.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::error::DeliveryError;
use super::frame::{PriceTick, SubscriberId};

/// Outcome of pushing one tick into a sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The tick was accepted for this subscriber
    Delivered,
    /// The transport is already gone
    Closed,
    /// The transport is open but cannot take the tick
    Failed(DeliveryError),
}

impl Delivery {
    /// Whether the subscriber should stay registered after this outcome
    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered)
    }
}

/// Capability to push a tick to one subscriber
///
/// Implementations must not block: the hub calls `deliver` for every
/// subscriber while holding the registry lock.
pub trait DeliverySink: Send + Sync + 'static {
    /// Push one tick
    fn deliver(&self, tick: &PriceTick) -> Delivery;
}

/// Sink backed by a bounded channel drained by the subscriber's stream
pub struct ChannelSink {
    tx: mpsc::Sender<PriceTick>,
}

impl ChannelSink {
    /// Create a sink and the receiver that drains it
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<PriceTick>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl DeliverySink for ChannelSink {
    fn deliver(&self, tick: &PriceTick) -> Delivery {
        match self.tx.try_send(tick.clone()) {
            Ok(()) => Delivery::Delivered,
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
            Err(mpsc::error::TrySendError::Full(_)) => Delivery::Failed(DeliveryError::Lagging {
                capacity: self.tx.max_capacity(),
            }),
        }
    }
}

/// A registered subscriber: id plus delivery handle
#[derive(Clone)]
pub struct Subscriber {
    /// Registry-unique id, valid for the connection's lifetime
    pub id: SubscriberId,
    sink: Arc<dyn DeliverySink>,
}

impl Subscriber {
    pub(super) fn new(id: SubscriberId, sink: Arc<dyn DeliverySink>) -> Self {
        Self { id, sink }
    }

    /// Push one tick to this subscriber
    pub fn deliver(&self, tick: &PriceTick) -> Delivery {
        self.sink.deliver(tick)
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_outcomes() {
        let (sink, mut rx) = ChannelSink::new(1);
        let tick = PriceTick::new("1.00");

        assert_eq!(sink.deliver(&tick), Delivery::Delivered);
        assert_eq!(
            sink.deliver(&tick),
            Delivery::Failed(DeliveryError::Lagging { capacity: 1 })
        );

        assert_eq!(rx.try_recv().unwrap(), tick);
        drop(rx);
        assert_eq!(sink.deliver(&tick), Delivery::Closed);
    }
}
