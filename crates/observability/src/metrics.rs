//! Prometheus-kompatible Metriken fuer das Signaling-Relay
//!
//! Registrierte Metriken:
//! - `fluesterpost_relay_verbindungen` – Gauge: Aktuell registrierte Signaling-Verbindungen
//! - `fluesterpost_relay_raeume` – Gauge: Raeume mit mindestens einer Verbindung
//! - `fluesterpost_relay_nachrichten_total` – Counter: Empfangene Nachrichten
//! - `fluesterpost_relay_zustellungen_total` – Counter: Erfolgreich eingereihte Zustellungen
//! - `fluesterpost_relay_fanout_fehler_total` – Counter: Fehlgeschlagene Zustellungen (Peer entfernt)

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Alle Relay-Metriken, eine eigene Registry pro Relay-Instanz
#[derive(Clone)]
pub struct RelayMetrics {
    pub registry: Arc<Registry>,

    pub verbindungen: IntGauge,
    pub raeume: IntGauge,
    pub nachrichten_total: IntCounter,
    pub zustellungen_total: IntCounter,
    pub fanout_fehler_total: IntCounter,
}

impl RelayMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let verbindungen = IntGauge::with_opts(Opts::new(
            "fluesterpost_relay_verbindungen",
            "Anzahl aktuell registrierter Signaling-Verbindungen",
        ))?;
        registry.register(Box::new(verbindungen.clone()))?;

        let raeume = IntGauge::with_opts(Opts::new(
            "fluesterpost_relay_raeume",
            "Anzahl Raeume mit mindestens einer Verbindung",
        ))?;
        registry.register(Box::new(raeume.clone()))?;

        let nachrichten_total = IntCounter::with_opts(Opts::new(
            "fluesterpost_relay_nachrichten_total",
            "Gesamtanzahl empfangener Signaling-Nachrichten",
        ))?;
        registry.register(Box::new(nachrichten_total.clone()))?;

        let zustellungen_total = IntCounter::with_opts(Opts::new(
            "fluesterpost_relay_zustellungen_total",
            "Gesamtanzahl eingereihter Zustellungen an andere Peers",
        ))?;
        registry.register(Box::new(zustellungen_total.clone()))?;

        let fanout_fehler_total = IntCounter::with_opts(Opts::new(
            "fluesterpost_relay_fanout_fehler_total",
            "Gesamtanzahl fehlgeschlagener Zustellungen (Peer wurde entfernt)",
        ))?;
        registry.register(Box::new(fanout_fehler_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            verbindungen,
            raeume,
            nachrichten_total,
            zustellungen_total,
            fanout_fehler_total,
        })
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: RelayMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<RelayMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metriken_erstellen_erfolgreich() {
        let metriken = RelayMetrics::neu().unwrap();
        assert!(!metriken.registry.gather().is_empty());
    }

    #[test]
    fn zwei_instanzen_kollidieren_nicht() {
        let a = RelayMetrics::neu().unwrap();
        let b = RelayMetrics::neu().unwrap();
        a.verbindungen.set(3);
        assert_eq!(b.verbindungen.get(), 0);
    }

    #[test]
    fn counter_inkrementieren() {
        let metriken = RelayMetrics::neu().unwrap();
        metriken.zustellungen_total.inc();
        metriken.zustellungen_total.inc_by(4);
        assert_eq!(metriken.zustellungen_total.get(), 5);
    }

    #[test]
    fn metriken_export_prometheus_format() {
        let metriken = RelayMetrics::neu().unwrap();
        metriken.verbindungen.set(2);
        metriken.fanout_fehler_total.inc();

        let output = metriken.exportieren().unwrap();
        assert!(output.contains("fluesterpost_relay_verbindungen 2"));
        assert!(output.contains("fluesterpost_relay_fanout_fehler_total 1"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }
}
