//! Tick and subscriber identity types
//!
//! This module defines the value that is broadcast to subscribers and the
//! key that identifies a subscriber inside a registry.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Identity of one subscriber connection, unique within its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub(crate) u64);

impl SubscriberId {
    /// Raw numeric id
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One price update, serialized on the wire as `{"price": "<decimal>"}`
///
/// Cheap to clone: all subscribers of a broadcast share the same string
/// allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTick {
    price: Arc<str>,
}

impl PriceTick {
    /// Create a tick from an already formatted decimal string
    pub fn new(price: impl Into<Arc<str>>) -> Self {
        Self {
            price: price.into(),
        }
    }

    /// Create a tick from a numeric value, formatted with two decimals
    pub fn from_value(value: f64) -> Self {
        Self::new(format!("{value:.2}"))
    }

    /// The decimal price as text
    pub fn price(&self) -> &str {
        &self.price
    }

    /// Encode as the JSON message body sent to clients
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a JSON message body received from an upstream tier
    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}

impl std::fmt::Display for PriceTick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.price)
    }
}
