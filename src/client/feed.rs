//! One SSE price subscription as a typed stream of ticks

use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::ACCEPT;

use crate::error::{Error, Result};
use crate::registry::PriceTick;

use super::sse::SseDecoder;

type BodyStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// An open streaming connection to a price endpoint
///
/// # Example
/// ```no_run
/// use price_relay::client::PriceFeed;
///
/// # async fn example() -> price_relay::Result<()> {
/// let http = reqwest::Client::new();
/// let mut feed = PriceFeed::connect(&http, "http://127.0.0.1:3000/price-updates").await?;
/// while let Some(tick) = feed.next_tick().await? {
///     println!("price: {}", tick.price());
/// }
/// # Ok(())
/// # }
/// ```
pub struct PriceFeed {
    body: BodyStream,
    decoder: SseDecoder,
}

impl PriceFeed {
    /// Open the stream; fails on transport errors or a non-success status
    pub async fn connect(http: &reqwest::Client, url: &str) -> Result<Self> {
        let response = http
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UpstreamStatus(status));
        }

        Ok(Self {
            body: Box::pin(response.bytes_stream()),
            decoder: SseDecoder::new(),
        })
    }

    /// Reconnect delay requested by the server through `retry:`, if any
    pub fn retry_hint(&self) -> Option<Duration> {
        self.decoder.retry()
    }

    /// Wait for the next tick
    ///
    /// Returns `Ok(None)` when the server ends the stream. A malformed
    /// message yields [`Error::Decode`]; the feed stays usable afterwards.
    pub async fn next_tick(&mut self) -> Result<Option<PriceTick>> {
        loop {
            while let Some(event) = self.decoder.next_event() {
                if event.event.as_deref().is_some_and(|name| name != "message") {
                    continue;
                }
                return Ok(Some(PriceTick::from_json(&event.data)?));
            }

            match self.body.next().await {
                Some(chunk) => self.decoder.push(&chunk?),
                None => return Ok(None),
            }
        }
    }
}
