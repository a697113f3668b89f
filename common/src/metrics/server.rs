use super::Metrics;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use warp::Filter;

/// Serves `GET /metrics` in the Prometheus text format until the token is cancelled.
pub fn serve_metrics(metrics: Arc<Metrics>, port: u16, cancel_token: CancellationToken) {
    tokio::spawn(async move {
        let route = warp::path!("metrics")
            .and(warp::get())
            .map(move || metrics.gather());

        let (addr, server) =
            warp::serve(route).bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
                cancel_token.cancelled().await;
                info!("Shutdown signal received, stopping metrics server...");
            });

        info!("Metrics server listening on {}", addr);
        server.await;
    });
}
