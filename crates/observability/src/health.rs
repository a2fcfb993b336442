//! Health-Check-Endpunkt fuer das Relay
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime und Anzahl verbundener Peers

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::RelayMetrics;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub verbundene_peers: i64,
}

/// Geteilter Zustand fuer den Health-Check-Handler
#[derive(Clone)]
pub struct HealthState {
    pub start_time: Arc<Instant>,
    pub metriken: RelayMetrics,
}

impl HealthState {
    pub fn neu(metriken: RelayMetrics) -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            metriken,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Erzeugt die aktuelle Health-Antwort
    pub fn antwort(&self) -> HealthResponse {
        HealthResponse {
            status: HealthStatus::Healthy,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.uptime_seconds(),
            verbundene_peers: self.metriken.verbindungen.get(),
        }
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – gibt den Relay-Status zurueck
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.antwort()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_state_frisch_erstellt() {
        let state = HealthState::neu(RelayMetrics::neu().unwrap());
        assert!(state.uptime_seconds() < 5);
    }

    #[test]
    fn antwort_spiegelt_verbindungen() {
        let metriken = RelayMetrics::neu().unwrap();
        let state = HealthState::neu(metriken.clone());
        metriken.verbindungen.set(2);

        let antwort = state.antwort();
        assert_eq!(antwort.status, HealthStatus::Healthy);
        assert_eq!(antwort.verbundene_peers, 2);
    }

    #[test]
    fn health_response_serialisierung() {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            version: "0.1.0".to_string(),
            uptime_seconds: 3600,
            verbundene_peers: 2,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"uptime_seconds\":3600"));
        assert!(json.contains("\"verbundene_peers\":2"));
    }

    #[test]
    fn health_response_deserialisierung() {
        let json = r#"{"status":"healthy","version":"0.1.0","uptime_seconds":1,"verbundene_peers":0}"#;
        let response: HealthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.status, HealthStatus::Healthy);
        assert_eq!(response.verbundene_peers, 0);

        let unbekannt = r#"{"status":"unhealthy","version":"0.1.0","uptime_seconds":1,"verbundene_peers":0}"#;
        assert!(serde_json::from_str::<HealthResponse>(unbekannt).is_err());
    }
}
