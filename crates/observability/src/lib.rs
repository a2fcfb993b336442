//! # fluesterpost-observability
//!
//! Observability-Crate fuer Fluesterpost:
//! - Prometheus-kompatible Relay-Metriken (`/metrics`)
//! - Health-Check-Endpunkt (`/health`)
//! - Structured Logging via tracing-subscriber (Text oder JSON)

pub mod health;
pub mod logging;
pub mod metrics;

pub use health::{health_router, HealthResponse, HealthState, HealthStatus};
pub use logging::{logging_initialisieren, LogZiel};
pub use metrics::{metrics_router, RelayMetrics};

use anyhow::Result;
use std::net::SocketAddr;

/// Router mit `/metrics` und `/health` fuer die gegebenen Relay-Metriken
pub fn observability_router(metriken: RelayMetrics) -> axum::Router {
    axum::Router::new()
        .merge(metrics_router(metriken.clone()))
        .merge(health_router(HealthState::neu(metriken)))
}

/// Startet den Observability-HTTP-Server (Metriken + Health)
///
/// Endpunkte:
/// - `GET /metrics` – Prometheus scrape format
/// - `GET /health`  – Health-Check JSON
pub async fn observability_server_starten(
    bind_addr: SocketAddr,
    metriken: RelayMetrics,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> Result<()> {
    let app = observability_router(metriken);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Observability-Server gestartet");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while shutdown_rx.changed().await.is_ok() {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        })
        .await?;
    Ok(())
}
