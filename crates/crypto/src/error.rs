//! Fehlertypen fuer den Nachrichten-Codec

use thiserror::Error;

/// Fehler im Kryptografie-Subsystem
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Ungueltige Schluessel-Laenge: erwartet 16, 24 oder 32 Bytes, erhalten {erhalten}")]
    UngueltigeSchluesselLaenge { erhalten: usize },

    #[error("Sichere Zufallsquelle nicht verfuegbar: {0}")]
    Zufall(String),

    #[error("Ungueltiges Nachrichtenformat: {0}")]
    Format(String),

    #[error("Authentifizierung fehlgeschlagen (falscher Schluessel oder manipulierte Daten)")]
    Authentifizierung,

    #[error("Verschluesselung fehlgeschlagen: {0}")]
    Verschluesselung(String),
}

impl CryptoError {
    /// Fehler, bei denen nur die einzelne Nachricht verworfen wird
    ///
    /// Konfigurationsfehler (Schluessel-Laenge) gehoeren nicht dazu.
    pub fn ist_nachrichtenfehler(&self) -> bool {
        matches!(self, Self::Format(_) | Self::Authentifizierung)
    }
}

pub type CryptoResult<T> = Result<T, CryptoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nachrichtenfehler_erkennung() {
        assert!(CryptoError::Authentifizierung.ist_nachrichtenfehler());
        assert!(CryptoError::Format("kurz".into()).ist_nachrichtenfehler());
        assert!(!CryptoError::UngueltigeSchluesselLaenge { erhalten: 5 }.ist_nachrichtenfehler());
    }

    #[test]
    fn schluessel_laenge_anzeige() {
        let e = CryptoError::UngueltigeSchluesselLaenge { erhalten: 15 };
        assert!(e.to_string().contains("erhalten 15"));
    }
}
