//! Fehlertypen fuer das Signaling-Relay

use fluesterpost_core::{FluesterpostError, VerbindungsId};
use thiserror::Error;

/// Fehlertyp fuer das Signaling-Relay
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (Bind, Accept, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Ungueltiger Raum im Pfad
    #[error("Ungueltiger Raum: {0}")]
    UngueltigerRaum(#[from] FluesterpostError),

    /// Zustellung an einen Peer fehlgeschlagen (Queue voll oder geschlossen)
    #[error("Zustellung an {id} fehlgeschlagen: {grund}")]
    Fanout { id: VerbindungsId, grund: String },
}

/// Result-Typ fuer das Signaling-Relay
pub type SignalingResult<T> = Result<T, SignalingError>;
