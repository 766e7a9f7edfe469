//! HTTP Server and Wiring
//!
//! Builds the snapshot store, registry and NetBox client, spawns the fetch
//! scheduler, and serves the scrape endpoints.
//!
//! # Endpoints
//!
//! - `GET /` - HTML landing page with links to metrics and health
//! - `GET <metrics_path>` - Prometheus metrics in text format (`/metrics` by default)
//! - `GET /health` - 200 when the last fetch cycle succeeded, 503 otherwise
//!
//! Scrapes are served from whatever snapshot is current; they never trigger or wait
//! for a fetch.
//!
//! # Shutdown
//!
//! On Ctrl-C or SIGTERM the listener stops accepting and the fetch scheduler is told
//! to stop through a `watch` channel.

use crate::config::Config;
use crate::error::ExporterError;
use crate::fetcher::{FetchOptions, Fetcher};
use crate::metrics::MetricsCollector;
use crate::netbox::NetboxClient;
use crate::snapshot::SnapshotStore;
use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Clone)]
struct AppState {
    metrics: MetricsCollector,
    metrics_path: String,
}

/// Router serving the landing page, metrics and health endpoints
pub fn router(metrics: MetricsCollector, metrics_path: &str) -> Router {
    let state = AppState {
        metrics,
        metrics_path: metrics_path.to_string(),
    };

    Router::new()
        .route("/", get(root_handler))
        .route(metrics_path, get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

pub async fn start(config: Config) -> anyhow::Result<()> {
    let store = Arc::new(SnapshotStore::new(config.snapshot.path.clone()));
    let metrics = MetricsCollector::new(store.clone())?;
    let client = Arc::new(
        NetboxClient::new(&config.netbox).context("Failed to build NetBox client")?,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let fetcher = Fetcher::new(
        client,
        store,
        metrics.clone(),
        FetchOptions::from_config(&config),
    );
    let fetch_task = fetcher.spawn(shutdown_rx);

    let app = router(metrics, &config.server.metrics_path);

    let addr = format!("{}:{}", config.server.addr, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ExporterError::Server(format!("failed to bind {}: {}", addr, e)))?;

    info!("Metrics server listening on {}", addr);
    info!(
        "Metrics available at http://{}{}",
        addr, config.server.metrics_path
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    let _ = shutdown_tx.send(true);
    if let Err(e) = fetch_task.await {
        warn!("Fetch task ended abnormally: {}", e);
    }

    served.context("HTTP server failed")?;
    info!("Exporter stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received");
}

async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Html(format!(
        r#"<html>
<head><title>NetBox Exporter</title></head>
<body>
<h1>NetBox Prometheus Exporter</h1>
<p><a href="{}">Metrics</a></p>
<p><a href="/health">Health</a></p>
</body>
</html>"#,
        state.metrics_path
    ))
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(metrics) => metrics.into_response(),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error rendering metrics: {}", e),
            )
                .into_response()
        }
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let up_value = state.metrics.up.get();

    if up_value > 0.0 {
        (StatusCode::OK, "OK")
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "Last NetBox fetch cycle did not succeed",
        )
    }
}
