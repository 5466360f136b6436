//! Upstream relay client
//!
//! Holds the relay tier's single subscription to the ingest tier and keeps
//! the latest received tick in a [`PriceCache`]. A lost link is retried with
//! exponential backoff for as long as anyone holds the cache.

use std::sync::Arc;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::registry::PriceTick;
use crate::stats::RelayStats;

use super::config::RelayConfig;
use super::feed::PriceFeed;

/// Steps before the backoff settles at its ceiling
const BACKOFF_STEPS: usize = 16;

/// How one upstream connection ended
struct LinkOutcome {
    received: u64,
    error: Error,
    retry_hint: Option<Duration>,
}

/// Read-only handle to the last tick received from upstream
#[derive(Clone)]
pub struct PriceCache {
    rx: watch::Receiver<Option<PriceTick>>,
}

impl PriceCache {
    /// Latest tick, or `None` before the first one arrives
    pub fn latest(&self) -> Option<PriceTick> {
        self.rx.borrow().clone()
    }

    /// Wait until the cached value is replaced
    ///
    /// Returns `false` once the writing client is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Single upstream subscriber feeding a relay tier's cache
pub struct UpstreamRelayClient {
    config: RelayConfig,
    http: reqwest::Client,
    cache: watch::Sender<Option<PriceTick>>,
    stats: Arc<RelayStats>,
}

impl UpstreamRelayClient {
    /// Create the client and the cache it writes
    pub fn new(config: RelayConfig) -> Result<(Self, PriceCache)> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        let (tx, rx) = watch::channel(None);

        let client = Self {
            config,
            http,
            cache: tx,
            stats: Arc::new(RelayStats::new()),
        };

        Ok((client, PriceCache { rx }))
    }

    /// Link counters, shared with the tier's stats endpoint
    pub fn stats(&self) -> Arc<RelayStats> {
        Arc::clone(&self.stats)
    }

    /// Run the link in a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Connect, relay, and reconnect until every [`PriceCache`] is dropped
    ///
    /// A `retry:` hint from the upstream raises the reconnect delay to at
    /// least the requested value.
    pub async fn run(self) {
        let mut backoff = self.backoff();
        let mut retry_hint = None;

        loop {
            self.stats.record_attempt();
            let outcome = self.stream_once().await;

            if self.cache.is_closed() {
                break;
            }
            if outcome.received > 0 {
                backoff = self.backoff();
            }
            retry_hint = outcome.retry_hint.or(retry_hint);

            let delay = backoff.next().unwrap_or(self.config.max_backoff);
            let delay = retry_hint.map_or(delay, |hint| delay.max(hint));
            tracing::warn!(
                url = %self.config.upstream_url,
                error = %outcome.error,
                received = outcome.received,
                retry_in = ?delay,
                "Upstream link lost"
            );
            tokio::time::sleep(delay).await;
        }

        tracing::info!(url = %self.config.upstream_url, "Upstream relay client stopped");
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBuilder::default()
            .with_min_delay(self.config.min_backoff)
            .with_max_delay(self.config.max_backoff)
            .with_max_times(BACKOFF_STEPS)
            .with_jitter()
            .build()
    }

    /// One connection lifetime: ticks received, why it ended, retry hint
    async fn stream_once(&self) -> LinkOutcome {
        let url = &self.config.upstream_url;
        let mut feed = match PriceFeed::connect(&self.http, url).await {
            Ok(feed) => feed,
            Err(error) => {
                return LinkOutcome {
                    received: 0,
                    error,
                    retry_hint: None,
                }
            }
        };

        self.stats.set_connected(true);
        tracing::info!(url = %url, "Connected to upstream");

        let mut received = 0;
        let error = loop {
            if self.cache.is_closed() {
                break Error::UpstreamClosed;
            }

            match tokio::time::timeout(self.config.idle_timeout, feed.next_tick()).await {
                Err(_) => break Error::UpstreamIdle(self.config.idle_timeout),
                Ok(Ok(Some(tick))) => {
                    received += 1;
                    self.stats.record_tick();
                    tracing::trace!(price = %tick, "Received upstream tick");
                    self.cache.send_replace(Some(tick));
                }
                Ok(Ok(None)) => break Error::UpstreamClosed,
                Ok(Err(Error::Decode(e))) => {
                    tracing::warn!(error = %e, "Ignoring malformed upstream message");
                }
                Ok(Err(e)) => break e,
            }
        };

        self.stats.set_connected(false);
        LinkOutcome {
            received,
            error,
            retry_hint: feed.retry_hint(),
        }
    }
}
