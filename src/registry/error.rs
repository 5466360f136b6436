//! Registry error types
//!
//! Error types for per-subscriber delivery.

/// Reason a single delivery attempt failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The subscriber's outbound queue is full; it is not keeping up
    #[error("subscriber queue full ({capacity} pending)")]
    Lagging { capacity: usize },
}
