//! HTTP serve loop
//!
//! Runs a tier's router on a bound listener until a shutdown signal fires.

use std::future::Future;
use std::sync::Arc;

use axum::Router;

use crate::error::Result;
use crate::registry::BroadcastHub;

use super::binder::BoundListener;

/// Serve `router` until `shutdown` resolves
///
/// On shutdown the hub is closed first so every open push stream ends and
/// the server can drain its connections.
pub async fn serve<F>(
    listener: BoundListener,
    router: Router,
    hub: Arc<BroadcastHub>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr();
    tracing::info!(addr = %addr, "HTTP server listening");

    axum::serve(listener.into_inner(), router)
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("Shutdown signal received");
            hub.close();
        })
        .await?;

    tracing::info!(addr = %addr, "HTTP server stopped");
    Ok(())
}
