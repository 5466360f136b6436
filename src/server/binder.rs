//! Listening socket with fallback to the next free port

use std::io;
use std::net::{IpAddr, SocketAddr};

use tokio::net::TcpListener;

use crate::error::{Error, Result};

use super::config::ServerConfig;

/// A bound listener and the address it actually holds
#[derive(Debug)]
pub struct BoundListener {
    listener: TcpListener,
    addr: SocketAddr,
}

impl BoundListener {
    /// The bound address
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// The bound port
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn into_inner(self) -> TcpListener {
        self.listener
    }
}

/// Binds the first free port at or after a starting port
#[derive(Debug, Clone)]
pub struct PortBinder {
    host: IpAddr,
    max_port: u16,
}

impl PortBinder {
    /// Scan on `host` up to the top of the port range
    pub fn new(host: IpAddr) -> Self {
        Self {
            host,
            max_port: u16::MAX,
        }
    }

    /// Binder for the host and port ceiling in `config`
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.host).max_port(config.max_port)
    }

    /// Set the last port to try
    pub fn max_port(mut self, port: u16) -> Self {
        self.max_port = port;
        self
    }

    /// Bind `start`, moving to the next port while the current one is in use
    ///
    /// Any error other than "address in use" is fatal and returned as
    /// [`Error::Bind`]. Running past the ceiling returns
    /// [`Error::PortsExhausted`].
    pub async fn bind_from(&self, start: u16) -> Result<BoundListener> {
        let exhausted = || Error::PortsExhausted {
            start,
            end: self.max_port,
        };
        if start > self.max_port {
            return Err(exhausted());
        }

        let mut port = start;
        loop {
            let addr = SocketAddr::new(self.host, port);

            match TcpListener::bind(addr).await {
                Ok(listener) => {
                    let addr = listener.local_addr()?;
                    tracing::info!(addr = %addr, "Bound listener");
                    return Ok(BoundListener { listener, addr });
                }
                Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                    if port >= self.max_port {
                        tracing::error!(start = start, end = self.max_port, "No free port left");
                        return Err(exhausted());
                    }
                    tracing::warn!(port = port, next = port + 1, "Port in use, trying next");
                    port += 1;
                }
                Err(e) => return Err(Error::Bind { addr, source: e }),
            }
        }
    }
}
