//! HTTP tiers
//!
//! - [`IngestTier`] serves `/price-updates` from its own price source.
//! - [`PublicTier`] serves `/public-price-updates` from a relayed cache.
//!
//! Both expose `/client-count` and `/stats`, allow any CORS origin, and bind
//! through [`PortBinder`], which falls back to the next port when one is
//! taken.

pub mod binder;
pub mod config;
pub mod ingest;
pub mod listener;
pub mod public;
pub mod routes;

pub use binder::{BoundListener, PortBinder};
pub use config::ServerConfig;
pub use ingest::{IngestTier, PRICE_UPDATES_PATH};
pub use listener::serve;
pub use public::{PublicStats, PublicTier, PUBLIC_PRICE_UPDATES_PATH};
pub use routes::ClientCount;
