//! fluesterpost-client – Bibliotheks-Root
//!
//! Ein Client-Prozess verbindet sich mit dem Relay, fuehrt den Handshake
//! in seiner Rolle aus und verbindet danach stdin/stdout mit dem
//! verschluesselten Data Channel.

pub mod config;
pub mod schluessel;

use anyhow::Result;
use config::ClientConfig;
use fluesterpost_core::Rolle;
use fluesterpost_crypto::NachrichtenCodec;
use fluesterpost_session::{
    ChatAdapter, HandshakeTreiber, Verhandlung, WebRtcVerhandlung, WsSignalVerbindung,
};
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::watch;

/// Ein Chat-Client mit fester Rolle
pub struct ChatClient {
    config: ClientConfig,
    codec: NachrichtenCodec,
}

impl ChatClient {
    pub fn neu(config: ClientConfig, codec: NachrichtenCodec) -> Self {
        Self { config, codec }
    }

    /// Fuehrt eine komplette Sitzung aus
    ///
    /// Endet wenn der Peer den Kanal schliesst oder `shutdown_rx` ein
    /// `true`-Signal empfaengt. Transport- und Handshake-Fehler werden
    /// zurueckgegeben.
    pub async fn ausfuehren(self, rolle: Rolle, mut shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        let url = self.config.relay_url()?;
        let mut signal = WsSignalVerbindung::verbinden(&url).await?;

        let verhandlung = Arc::new(WebRtcVerhandlung::neu(&self.config.webrtc.stun_server).await?);
        let treiber = HandshakeTreiber::neu(verhandlung.clone(), self.config.handshake_timeout());

        tracing::info!(rolle = %rolle, relay = %url, "Handshake startet");

        let kanal = tokio::select! {
            ergebnis = treiber.ausfuehren(rolle, &mut signal) => ergebnis?,
            _ = stopp_abwarten(&mut shutdown_rx) => {
                tracing::info!("Abbruch waehrend des Handshakes");
                signal.schliessen().await;
                verhandlung.schliessen().await?;
                return Ok(());
            }
        };

        eprintln!("Verbunden. Nachrichten eingeben, Ctrl-C beendet.");

        let mut sitzung = ChatAdapter::starten(
            kanal,
            self.codec,
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
        )?;

        tokio::select! {
            _ = sitzung.kanal_geschlossen() => {
                eprintln!("Peer hat die Verbindung beendet.");
            }
            _ = stopp_abwarten(&mut shutdown_rx) => {}
        }

        sitzung.beenden().await;
        signal.schliessen().await;
        if let Err(e) = verhandlung.schliessen().await {
            tracing::warn!(fehler = %e, "Peer-Verbindung nicht sauber geschlossen");
        }
        Ok(())
    }
}

/// Wartet auf `true` im Shutdown-Kanal, ohne Sender wartet es nie aus
async fn stopp_abwarten(shutdown_rx: &mut watch::Receiver<bool>) {
    if shutdown_rx.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
