//! Fehlertypen fuer Handshake und Chat-Sitzung

use fluesterpost_core::FluesterpostError;
use thiserror::Error;

/// Fehlertyp fuer eine Peer-Sitzung
#[derive(Debug, Error)]
pub enum SessionError {
    /// Peer-Verbindung oder Relay-Verbindung konnte nicht aufgebaut werden
    #[error("Transport-Setup fehlgeschlagen: {0}")]
    TransportSetup(String),

    /// Relay-Verbindung beendet oder Lesefehler
    #[error("Relay-Verbindung getrennt: {0}")]
    RelayGetrennt(String),

    /// Beschreibung erstellen oder anwenden fehlgeschlagen
    #[error("Verhandlung fehlgeschlagen: {0}")]
    Verhandlung(String),

    /// Nachricht passt nicht zur Rolle (wird nur geloggt)
    #[error("Protokollfehler: {0}")]
    ProtokollFehler(String),

    /// Eine Handshake-Phase hat das Zeitlimit ueberschritten
    #[error("Handshake-Timeout in Phase '{phase}'")]
    HandshakeTimeout { phase: &'static str },

    /// Unzulaessiger Zustandswechsel im Handshake
    #[error("Ungueltiger Uebergang: {von} -> {nach}")]
    UngueltigerUebergang { von: String, nach: String },

    /// Data Channel geschlossen oder Senden fehlgeschlagen
    #[error("Data Channel: {0}")]
    Kanal(String),

    /// Beschreibung konnte nicht kodiert werden
    #[error(transparent)]
    Kodierung(#[from] FluesterpostError),
}

impl SessionError {
    /// Erstellt einen Verhandlungsfehler
    pub fn verhandlung(msg: impl Into<String>) -> Self {
        Self::Verhandlung(msg.into())
    }

    /// Erstellt einen Kanal-Fehler
    pub fn kanal(msg: impl Into<String>) -> Self {
        Self::Kanal(msg.into())
    }
}

/// Result-Typ fuer Peer-Sitzungen
pub type SessionResult<T> = Result<T, SessionError>;
