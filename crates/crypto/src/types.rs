//! Schluessel-Container fuer den Nachrichten-Codec

use base64::{engine::general_purpose::STANDARD, Engine as _};

use aes_gcm::aead::{rand_core::RngCore, OsRng};

use crate::error::{CryptoError, CryptoResult};

/// Erlaubte Schluessel-Laengen (AES-128, AES-192, AES-256)
pub const GUELTIGE_SCHLUESSEL_LAENGEN: [usize; 3] = [16, 24, 32];

/// Praefix fuer base64-kodierte Schluessel in Konfiguration und Umgebung
pub const BASE64_PRAEFIX: &str = "base64:";

/// Geteilter symmetrischer Schluessel (wird beim Drop genullt)
///
/// Beide Peers muessen byte-identische Schluessel halten. Der Schluessel
/// wird out-of-band verteilt und nie einkompiliert.
#[derive(Clone)]
pub struct SymmetrischerSchluessel(Vec<u8>);

impl Drop for SymmetrischerSchluessel {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SymmetrischerSchluessel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SymmetrischerSchluessel([REDACTED] {} bytes)", self.0.len())
    }
}

impl SymmetrischerSchluessel {
    /// Uebernimmt rohe Schluessel-Bytes (16, 24 oder 32)
    pub fn aus_bytes(bytes: Vec<u8>) -> CryptoResult<Self> {
        pruefe_laenge(bytes.len())?;
        Ok(Self(bytes))
    }

    /// Dekodiert einen base64-Schluessel (Standard-Alphabet mit Padding)
    pub fn aus_base64(text: &str) -> CryptoResult<Self> {
        let bytes = STANDARD
            .decode(text.trim())
            .map_err(|e| CryptoError::Format(format!("Schluessel nicht base64: {e}")))?;
        Self::aus_bytes(bytes)
    }

    /// Liest einen Schluessel aus Konfiguration oder Umgebung
    ///
    /// `base64:<...>` wird dekodiert, alles andere gilt als roher Text
    /// (z.B. `abcdefghijklmnop` fuer AES-128).
    pub fn aus_konfiguration(wert: &str) -> CryptoResult<Self> {
        match wert.strip_prefix(BASE64_PRAEFIX) {
            Some(kodiert) => Self::aus_base64(kodiert),
            None => Self::aus_bytes(wert.as_bytes().to_vec()),
        }
    }

    /// Erzeugt einen neuen zufaelligen Schluessel der gegebenen Laenge
    pub fn zufaellig(laenge: usize) -> CryptoResult<Self> {
        pruefe_laenge(laenge)?;
        let mut bytes = vec![0u8; laenge];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CryptoError::Zufall(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Konfigurations-Darstellung (`base64:<...>`)
    pub fn als_konfiguration(&self) -> String {
        format!("{BASE64_PRAEFIX}{}", STANDARD.encode(&self.0))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub(crate) fn pruefe_laenge(laenge: usize) -> CryptoResult<()> {
    if GUELTIGE_SCHLUESSEL_LAENGEN.contains(&laenge) {
        Ok(())
    } else {
        Err(CryptoError::UngueltigeSchluesselLaenge { erhalten: laenge })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gueltige_laengen() {
        for laenge in GUELTIGE_SCHLUESSEL_LAENGEN {
            assert!(SymmetrischerSchluessel::aus_bytes(vec![7u8; laenge]).is_ok());
        }
    }

    #[test]
    fn ungueltige_laengen() {
        for laenge in [0, 1, 15, 17, 31, 33, 64] {
            let result = SymmetrischerSchluessel::aus_bytes(vec![0u8; laenge]);
            assert!(matches!(
                result,
                Err(CryptoError::UngueltigeSchluesselLaenge { erhalten }) if erhalten == laenge
            ));
        }
    }

    #[test]
    fn roher_text_als_schluessel() {
        let schluessel = SymmetrischerSchluessel::aus_konfiguration("abcdefghijklmnop").unwrap();
        assert_eq!(schluessel.as_bytes(), b"abcdefghijklmnop");
    }

    #[test]
    fn base64_schluessel_roundtrip() {
        let original = SymmetrischerSchluessel::zufaellig(32).unwrap();
        let text = original.als_konfiguration();
        assert!(text.starts_with(BASE64_PRAEFIX));

        let geladen = SymmetrischerSchluessel::aus_konfiguration(&text).unwrap();
        assert_eq!(geladen.as_bytes(), original.as_bytes());
    }

    #[test]
    fn kaputtes_base64_ist_formatfehler() {
        let result = SymmetrischerSchluessel::aus_konfiguration("base64:!!!");
        assert!(matches!(result, Err(CryptoError::Format(_))));
    }

    #[test]
    fn debug_zeigt_keine_bytes() {
        let schluessel = SymmetrischerSchluessel::aus_konfiguration("abcdefghijklmnop").unwrap();
        let debug = format!("{schluessel:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("abcdefghijklmnop"));
    }

    #[test]
    fn zufaellige_schluessel_unterscheiden_sich() {
        let a = SymmetrischerSchluessel::zufaellig(16).unwrap();
        let b = SymmetrischerSchluessel::zufaellig(16).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
        assert!(SymmetrischerSchluessel::zufaellig(20).is_err());
    }
}
