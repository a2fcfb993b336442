//! Fluesterpost Relay – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet das
//! Signaling-Relay.

use anyhow::Result;
use fluesterpost_observability::{logging_initialisieren, LogZiel};
use fluesterpost_relay::{config::RelayConfig, Relay};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad =
        std::env::var("FLUESTERPOST_RELAY_CONFIG").unwrap_or_else(|_| "relay.toml".into());

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let config = RelayConfig::laden(&config_pfad)?;

    // Logging initialisieren
    logging_initialisieren(&config.logging.level, &config.logging.format, LogZiel::Stdout);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "Fluesterpost Relay wird initialisiert"
    );

    // Ctrl-C -> Shutdown-Signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown-Signal empfangen, Relay wird beendet"),
            Err(e) => tracing::error!(fehler = %e, "Ctrl-C-Handler fehlgeschlagen"),
        }
        let _ = shutdown_tx.send(true);
    });

    Relay::neu(config).starten(shutdown_rx).await
}
