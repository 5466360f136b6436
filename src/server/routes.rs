//! HTTP pieces shared by both tiers

use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{stream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::registry::{PriceTick, Subscription};

/// Body of `GET /client-count`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCount {
    pub connected_clients: usize,
}

/// Any origin, method and header
pub(crate) fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Ticks from `subscription`, each held back by `latency`
///
/// While a tick is held, newer ticks keep being taken off the queue and
/// replace it, so only the latest value goes out once the delay ends. A
/// delay longer than the broadcast cadence slows delivery down but never
/// lets the queue fill up.
pub(crate) fn delayed_ticks(
    subscription: Subscription,
    latency: Duration,
) -> impl Stream<Item = PriceTick> {
    stream::unfold(subscription, move |mut subscription| async move {
        let mut tick = subscription.next().await?;
        if latency.is_zero() {
            return Some((tick, subscription));
        }

        let delay = tokio::time::sleep(latency);
        tokio::pin!(delay);
        loop {
            tokio::select! {
                biased;
                _ = &mut delay => break,
                newer = subscription.next() => match newer {
                    Some(newer) => tick = newer,
                    None => {
                        (&mut delay).await;
                        break;
                    }
                },
            }
        }

        Some((tick, subscription))
    })
}

/// Turn a subscription into an SSE response body
///
/// Dropping the response (client gone) drops the subscription, which
/// unregisters it.
pub(crate) fn price_stream(
    subscription: Subscription,
    latency: Duration,
    keep_alive: Duration,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let events =
        delayed_ticks(subscription, latency).map(|tick| Event::default().json_data(&tick));

    Sse::new(events).keep_alive(KeepAlive::new().interval(keep_alive))
}
