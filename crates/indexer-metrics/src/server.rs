use crate::config::MetricsConfig;
use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::broadcast;
use tracing::info;

/// Serves `/metrics` and `/health` until shutdown
pub struct MetricsServer {
    config: MetricsConfig,
    handle: PrometheusHandle,
}

impl MetricsServer {
    /// `handle` comes from [`crate::init`]; the recorder is installed only once
    pub fn new(config: MetricsConfig, handle: PrometheusHandle) -> Self {
        Self { config, handle }
    }

    fn router(handle: PrometheusHandle) -> Router {
        Router::new()
            .route("/metrics", get(move || metrics_handler(handle.clone())))
            .route("/health", get(health_handler))
    }

    /// Serve until `shutdown` fires, letting open requests finish
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> crate::Result<()> {
        let addr = self.config.address();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::MetricsError::Server(e.to_string()))?;
        info!(address = %addr, "Metrics endpoint listening");

        axum::serve(listener, Self::router(self.handle))
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await
            .map_err(|e| crate::MetricsError::Server(e.to_string()))?;

        info!("Metrics endpoint stopped");
        Ok(())
    }
}

async fn metrics_handler(handle: PrometheusHandle) -> String {
    handle.render()
}

async fn health_handler() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[tokio::test]
    async fn test_metrics_page_renders_recorded_values() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || crate::counters::blocks_processed(3));

        let page = metrics_handler(handle).await;
        assert!(page.contains("indexer_blocks_processed_total 3"), "{}", page);
        assert_eq!(health_handler().await, "OK");
    }
}
