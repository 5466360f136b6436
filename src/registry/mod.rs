//! Subscriber registry and broadcast fan-out
//!
//! Each tier owns one [`BroadcastHub`], which owns one [`ClientRegistry`].
//! Every subscriber gets a bounded queue; the hub pushes into all queues
//! under the registry lock and the subscriber's HTTP stream drains its own.
//!
//! # Architecture
//!
//! ```text
//!                          Arc<BroadcastHub>
//!                     ┌─────────────────────────┐
//!                     │ registry: {             │
//!                     │   id -> Subscriber {    │
//!                     │     sink: ChannelSink,  │
//!                     │   }                     │
//!                     │ }                       │
//!                     └───────────┬─────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!   [update timer]          [Subscription]          [Subscription]
//!   hub.broadcast()         rx.poll_recv()          rx.poll_recv()
//!         │                       │                       │
//!         └──► deliver_all() ──► try_send() ──► SSE ──► TCP
//! ```
//!
//! A delivery that finds the queue closed or full evicts the subscriber in
//! the same pass; no other subscriber is affected.

pub mod config;
pub mod entry;
pub mod error;
pub mod frame;
pub mod hub;
pub mod store;

pub use config::RegistryConfig;
pub use entry::{ChannelSink, Delivery, DeliverySink, Subscriber};
pub use error::DeliveryError;
pub use frame::{PriceTick, SubscriberId};
pub use hub::{BroadcastHub, Subscription};
pub use store::{ClientRegistry, DeliveryReport};
