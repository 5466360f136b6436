//! Two-tier price broadcasting over Server-Sent Events
//!
//! An ingest tier owns the canonical price and fans every update out to its
//! subscribers. A public relay tier subscribes to the ingest tier once and
//! re-serves the cached value to any number of external clients.
//!
//! ```text
//!   PriceSource ──► BroadcastHub ──► ClientRegistry ──► SSE /price-updates
//!                                                           │
//!                                  UpstreamRelayClient ◄────┘
//!                                          │
//!                                     PriceCache
//!                                          │ (pump)
//!                       BroadcastHub ──► ClientRegistry ──► SSE /public-price-updates
//! ```
//!
//! # Example
//! ```no_run
//! use price_relay::server::{IngestTier, PortBinder, ServerConfig};
//!
//! # async fn example() -> price_relay::Result<()> {
//! let config = ServerConfig::default();
//! let listener = PortBinder::from_config(&config).bind_from(config.port).await?;
//! let tier = IngestTier::new(config);
//! tier.run_until(listener, async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod logging;
pub mod registry;
pub mod server;
pub mod source;
pub mod stats;

pub use error::{Error, Result};
pub use registry::{BroadcastHub, ClientRegistry, PriceTick, Subscription};
pub use server::{IngestTier, PublicTier, ServerConfig};
