//! Schnittstellen zwischen Handshake-Treiber und Transport
//!
//! Der Treiber kennt nur diese Traits. Produktiv stehen dahinter der
//! `webrtc`-Crate und eine WebSocket-Verbindung zum Relay, in Tests
//! die In-Memory-Varianten aus [`crate::speicher`].

use async_trait::async_trait;
use fluesterpost_core::SitzungsBeschreibung;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::SessionResult;

/// Label des Chat-Data-Channels
pub const KANAL_LABEL: &str = "chat";

/// Verhandlung einer Peer-Verbindung (Angebot/Antwort, ICE-Sammlung)
#[async_trait]
pub trait Verhandlung: Send + Sync {
    /// Erstellt den lokalen Data Channel (nur Initiator)
    async fn lokalen_kanal_erstellen(&self, label: &str) -> SessionResult<Arc<dyn DatenKanal>>;

    async fn angebot_erstellen(&self) -> SessionResult<SitzungsBeschreibung>;

    async fn antwort_erstellen(&self) -> SessionResult<SitzungsBeschreibung>;

    /// Setzt die lokale Beschreibung und startet die Kandidaten-Sammlung
    async fn lokale_beschreibung_setzen(&self, beschreibung: SitzungsBeschreibung)
        -> SessionResult<()>;

    async fn remote_beschreibung_setzen(
        &self,
        beschreibung: SitzungsBeschreibung,
    ) -> SessionResult<()>;

    /// Wartet bis die Kandidaten-Sammlung abgeschlossen ist
    async fn sammlung_abwarten(&self) -> SessionResult<()>;

    /// Finalisierte lokale Beschreibung inklusive gesammelter Kandidaten
    async fn lokale_beschreibung(&self) -> SessionResult<SitzungsBeschreibung>;

    /// Wartet auf den von der Gegenseite erstellten Data Channel (nur Responder)
    async fn eingehenden_kanal_abwarten(&self) -> SessionResult<Arc<dyn DatenKanal>>;

    async fn schliessen(&self) -> SessionResult<()>;
}

/// Ein Data Channel zwischen zwei Peers
#[async_trait]
pub trait DatenKanal: Send + Sync {
    fn label(&self) -> String;

    /// Wartet bis der Kanal offen ist
    async fn offen_abwarten(&self) -> SessionResult<()>;

    async fn text_senden(&self, text: &str) -> SessionResult<()>;

    /// Uebernimmt den Strom eingehender Nachrichten
    ///
    /// Liefert nur beim ersten Aufruf `Some`. Der Strom endet wenn der
    /// Kanal geschlossen wird.
    fn nachrichten(&self) -> Option<mpsc::Receiver<Vec<u8>>>;
}

/// Verbindung zum Signaling-Relay
#[async_trait]
pub trait SignalVerbindung: Send {
    async fn senden(&mut self, text: String) -> SessionResult<()>;

    /// Naechste Text-Nachricht vom Relay
    ///
    /// `None` wenn die Verbindung regulaer beendet wurde.
    async fn empfangen(&mut self) -> Option<SessionResult<String>>;
}
