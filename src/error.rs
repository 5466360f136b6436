//! Crate-wide error types

use std::net::SocketAddr;
use std::time::Duration;

/// Errors raised while binding, serving, or talking to an upstream tier
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bind failed for a reason other than the port being taken
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Every port in the scan range was already in use
    #[error("no free port between {start} and {end}")]
    PortsExhausted { start: u16, end: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream responded with status {0}")]
    UpstreamStatus(reqwest::StatusCode),

    #[error("upstream closed the stream")]
    UpstreamClosed,

    #[error("upstream sent nothing for {0:?}")]
    UpstreamIdle(Duration),

    #[error("invalid price message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result alias using the crate [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;
