//! Streaming client side
//!
//! Provides client-side SSE for:
//! - Subscribing to a price endpoint as a typed stream of ticks
//! - Keeping a relay tier's cached value fed from the ingest tier

pub mod config;
pub mod feed;
pub mod sse;
pub mod upstream;

pub use config::RelayConfig;
pub use feed::PriceFeed;
pub use sse::{SseDecoder, SseEvent};
pub use upstream::{PriceCache, UpstreamRelayClient};
