//! fluesterpost-relay – Bibliotheks-Root
//!
//! Deklariert die Relay-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;

use anyhow::{Context, Result};
use config::RelayConfig;
use fluesterpost_observability::{observability_server_starten, RelayMetrics};
use fluesterpost_signaling::{RelayHub, RelayServer};
use tokio::sync::watch;

/// Haelt den Relay-Zustand zusammen
pub struct Relay {
    pub config: RelayConfig,
}

impl Relay {
    /// Erstellt ein neues Relay aus der gegebenen Konfiguration
    pub fn neu(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Startet alle Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Metriken und Hub erstellen
    /// 2. Observability-Server starten (falls aktiviert)
    /// 3. WebSocket-Listener starten
    /// 4. Bei Shutdown alle Verbindungen trennen
    pub async fn starten(self, shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        let relay_addr = self.config.relay_bind_adresse()?;

        let metriken = RelayMetrics::neu().context("Metriken konnten nicht erstellt werden")?;
        let hub = RelayHub::neu(self.config.relay.queue_groesse, metriken.clone());

        let observability = if self.config.observability.aktiviert {
            let addr = self.config.observability_bind_adresse()?;
            let rx = shutdown_rx.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = observability_server_starten(addr, metriken, rx).await {
                    tracing::error!(fehler = %e, "Observability-Server beendet");
                }
            }))
        } else {
            None
        };

        tracing::info!(
            adresse = %relay_addr,
            queue_groesse = self.config.relay.queue_groesse,
            observability = self.config.observability.aktiviert,
            "Relay startet"
        );

        let ergebnis = RelayServer::neu(hub, relay_addr)
            .starten(shutdown_rx)
            .await
            .with_context(|| format!("Relay auf {relay_addr} konnte nicht starten"));

        if let Some(task) = observability {
            if ergebnis.is_err() {
                task.abort();
            }
            let _ = task.await;
        }

        ergebnis
    }
}
