//! Counters exposed on the `/stats` endpoint

pub mod metrics;

pub use metrics::{HubSnapshot, HubStats, RelaySnapshot, RelayStats};
