//! Handshake-Treiber – Angebot/Antwort ueber das Relay bis zum offenen Kanal
//!
//! Der Treiber arbeitet fuer genau eine Rolle und genau eine Sitzung. Er
//! wendet die erste passende Remote-Beschreibung an und hoert danach auf,
//! das Relay zu lesen. Spaetere Angebote erreichen diese Sitzung nie.
//!
//! ## Fehlerpolitik
//! - Nicht dekodierbares JSON: geloggt, ignoriert
//! - Falscher Beschreibungstyp: geloggt, ignoriert
//! - Relay getrennt, Anwenden abgelehnt, Timeout: Sitzung fehlgeschlagen
//!
//! Jede Wartephase ist durch das Handshake-Timeout begrenzt.

use fluesterpost_core::{BeschreibungsTyp, Rolle, SitzungsBeschreibung};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::error::{SessionError, SessionResult};
use crate::verhandlung::{DatenKanal, SignalVerbindung, Verhandlung, KANAL_LABEL};
use crate::zustand::HandshakeZustand;

/// Standard-Zeitlimit pro Wartephase
pub const STANDARD_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(60);

/// Fuehrt den Handshake einer Rolle aus
pub struct HandshakeTreiber {
    verhandlung: Arc<dyn Verhandlung>,
    timeout: Duration,
    zustand_tx: watch::Sender<HandshakeZustand>,
}

impl HandshakeTreiber {
    pub fn neu(verhandlung: Arc<dyn Verhandlung>, timeout: Duration) -> Self {
        let (zustand_tx, _) = watch::channel(HandshakeZustand::Leerlauf);
        Self {
            verhandlung,
            timeout,
            zustand_tx,
        }
    }

    /// Beobachter fuer Zustandswechsel
    pub fn zustand(&self) -> watch::Receiver<HandshakeZustand> {
        self.zustand_tx.subscribe()
    }

    pub fn aktueller_zustand(&self) -> HandshakeZustand {
        self.zustand_tx.borrow().clone()
    }

    /// Fuehrt den Handshake fuer die gegebene Rolle aus
    pub async fn ausfuehren(
        &self,
        rolle: Rolle,
        relay: &mut dyn SignalVerbindung,
    ) -> SessionResult<Arc<dyn DatenKanal>> {
        match rolle {
            Rolle::Initiator => self.initiator_ausfuehren(relay).await,
            Rolle::Responder => self.responder_ausfuehren(relay).await,
        }
    }

    /// Initiator: Kanal erstellen, Angebot senden, erste Antwort anwenden
    pub async fn initiator_ausfuehren(
        &self,
        relay: &mut dyn SignalVerbindung,
    ) -> SessionResult<Arc<dyn DatenKanal>> {
        let ergebnis = self.initiator_schritte(relay).await;
        self.abschliessen(Rolle::Initiator, ergebnis)
    }

    /// Responder: erstes Angebot anwenden, Antwort senden, Kanal abwarten
    pub async fn responder_ausfuehren(
        &self,
        relay: &mut dyn SignalVerbindung,
    ) -> SessionResult<Arc<dyn DatenKanal>> {
        let ergebnis = self.responder_schritte(relay).await;
        self.abschliessen(Rolle::Responder, ergebnis)
    }

    async fn initiator_schritte(
        &self,
        relay: &mut dyn SignalVerbindung,
    ) -> SessionResult<Arc<dyn DatenKanal>> {
        let kanal = self.verhandlung.lokalen_kanal_erstellen(KANAL_LABEL).await?;

        let angebot = self.verhandlung.angebot_erstellen().await?;
        self.verhandlung.lokale_beschreibung_setzen(angebot).await?;
        self.begrenzt("ICE-Sammlung", self.verhandlung.sammlung_abwarten()).await?;
        self.uebergang(HandshakeZustand::LokaleBeschreibungBereit)?;

        self.lokale_beschreibung_senden(relay).await?;
        self.uebergang(HandshakeZustand::WartetAufRemoteBeschreibung)?;

        let antwort = self
            .begrenzt(
                "Remote-Beschreibung",
                remote_beschreibung_empfangen(relay, BeschreibungsTyp::Answer),
            )
            .await?;
        self.verhandlung.remote_beschreibung_setzen(antwort).await?;
        self.uebergang(HandshakeZustand::RemoteBeschreibungGesetzt)?;

        self.begrenzt("Kanal-Oeffnung", kanal.offen_abwarten()).await?;
        self.uebergang(HandshakeZustand::KanalOffen)?;
        Ok(kanal)
    }

    async fn responder_schritte(
        &self,
        relay: &mut dyn SignalVerbindung,
    ) -> SessionResult<Arc<dyn DatenKanal>> {
        self.uebergang(HandshakeZustand::WartetAufRemoteBeschreibung)?;

        let angebot = self
            .begrenzt(
                "Remote-Beschreibung",
                remote_beschreibung_empfangen(relay, BeschreibungsTyp::Offer),
            )
            .await?;
        self.verhandlung.remote_beschreibung_setzen(angebot).await?;
        self.uebergang(HandshakeZustand::RemoteBeschreibungGesetzt)?;

        let antwort = self.verhandlung.antwort_erstellen().await?;
        self.verhandlung.lokale_beschreibung_setzen(antwort).await?;
        self.begrenzt("ICE-Sammlung", self.verhandlung.sammlung_abwarten()).await?;
        self.uebergang(HandshakeZustand::LokaleBeschreibungBereit)?;

        self.lokale_beschreibung_senden(relay).await?;

        let kanal = self
            .begrenzt(
                "Eingehender Kanal",
                self.verhandlung.eingehenden_kanal_abwarten(),
            )
            .await?;
        self.begrenzt("Kanal-Oeffnung", kanal.offen_abwarten()).await?;
        self.uebergang(HandshakeZustand::KanalOffen)?;
        Ok(kanal)
    }

    async fn lokale_beschreibung_senden(&self, relay: &mut dyn SignalVerbindung) -> SessionResult<()> {
        let lokal = self.verhandlung.lokale_beschreibung().await?;
        tracing::debug!(typ = %lokal.typ, sdp_bytes = lokal.sdp.len(), "Sende lokale Beschreibung");
        relay.senden(lokal.zu_json()?).await
    }

    fn uebergang(&self, nach: HandshakeZustand) -> SessionResult<()> {
        let neu = self.zustand_tx.borrow().uebergang(nach)?;
        tracing::debug!(zustand = %neu, "Handshake-Zustand");
        self.zustand_tx.send_replace(neu);
        Ok(())
    }

    async fn begrenzt<T>(
        &self,
        phase: &'static str,
        schritt: impl Future<Output = SessionResult<T>>,
    ) -> SessionResult<T> {
        match tokio::time::timeout(self.timeout, schritt).await {
            Ok(ergebnis) => ergebnis,
            Err(_) => Err(SessionError::HandshakeTimeout { phase }),
        }
    }

    fn abschliessen(
        &self,
        rolle: Rolle,
        ergebnis: SessionResult<Arc<dyn DatenKanal>>,
    ) -> SessionResult<Arc<dyn DatenKanal>> {
        match &ergebnis {
            Ok(kanal) => {
                tracing::info!(rolle = %rolle, kanal = %kanal.label(), "Handshake abgeschlossen");
            }
            Err(fehler) => {
                tracing::error!(rolle = %rolle, fehler = %fehler, "Handshake fehlgeschlagen");
                if !self.zustand_tx.borrow().ist_terminal() {
                    self.zustand_tx
                        .send_replace(HandshakeZustand::Fehlgeschlagen(fehler.to_string()));
                }
            }
        }
        ergebnis
    }
}

/// Liest das Relay bis zur ersten Beschreibung vom erwarteten Typ
///
/// Nicht dekodierbare Nachrichten und Beschreibungen vom falschen Typ
/// werden geloggt und uebersprungen.
async fn remote_beschreibung_empfangen(
    relay: &mut dyn SignalVerbindung,
    erwartet: BeschreibungsTyp,
) -> SessionResult<SitzungsBeschreibung> {
    loop {
        let text = match relay.empfangen().await {
            Some(Ok(text)) => text,
            Some(Err(fehler)) => return Err(fehler),
            None => {
                return Err(SessionError::RelayGetrennt(
                    "Relay hat die Verbindung beendet".into(),
                ))
            }
        };

        let beschreibung = match SitzungsBeschreibung::aus_json(&text) {
            Ok(beschreibung) => beschreibung,
            Err(e) => {
                tracing::warn!(fehler = %e, bytes = text.len(), "Nicht dekodierbare Signaling-Nachricht ignoriert");
                continue;
            }
        };

        if beschreibung.typ != erwartet {
            let fehler = SessionError::ProtokollFehler(format!(
                "erwartet {erwartet}, erhalten {}",
                beschreibung.typ
            ));
            tracing::warn!(fehler = %fehler, "Signaling-Nachricht ignoriert");
            continue;
        }

        return Ok(beschreibung);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
