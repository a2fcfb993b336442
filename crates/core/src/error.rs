//! Fehlertypen fuer Fluesterpost
//!
//! Zentraler Fehler-Enum fuer die gemeinsamen Typen. Die Fach-Crates
//! (Crypto, Signaling, Session) definieren eigene Fehler und konvertieren
//! diesen hier via `#[from]`.

use thiserror::Error;

/// Globaler Result-Alias fuer Fluesterpost
pub type Result<T> = std::result::Result<T, FluesterpostError>;

/// Fehler der gemeinsamen Typen
#[derive(Debug, Error)]
pub enum FluesterpostError {
    #[error("Ungueltige Raum-ID '{0}': erlaubt sind 1-64 Zeichen aus [A-Za-z0-9_-]")]
    UngueltigeRaumId(String),

    #[error("Ungueltige Rolle '{0}': erwartet 'offer' oder 'answer'")]
    UngueltigeRolle(String),

    #[error("Ungueltige Sitzungsbeschreibung: {0}")]
    UngueltigeBeschreibung(#[from] serde_json::Error),

}
