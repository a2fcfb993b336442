//! Nachrichten-Codec fuer Chat-Nachrichten
//!
//! Verschluesselt Klartext-Zeilen mit dem geteilten Schluessel (AES-GCM)
//! und kodiert das Ergebnis text-sicher fuer den Data Channel.
//!
//! ## Format
//! ```text
//! base64( [nonce(12)] [ciphertext] [auth_tag(16)] )
//! ```
//!
//! Die Nonce wird pro Nachricht frisch aus dem OS-Zufallsgenerator gezogen.
//! Die Schluessel-Laenge waehlt die Variante: 16 -> AES-128, 24 -> AES-192,
//! 32 -> AES-256.

use aes_gcm::{
    aead::{consts::U12, rand_core::RngCore, Aead, KeyInit, OsRng},
    aes::Aes192,
    Aes128Gcm, Aes256Gcm, AesGcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;

use crate::error::{CryptoError, CryptoResult};
use crate::types::{pruefe_laenge, SymmetrischerSchluessel};

/// Nonce-Laenge in Bytes (96 Bit, GCM-Standard)
pub const NONCE_LAENGE: usize = 12;

/// Laenge des Auth-Tags in Bytes
pub const TAG_LAENGE: usize = 16;

type Aes192Gcm = AesGcm<Aes192, U12>;

/// Zustandsloser AES-GCM Codec ueber einem festen Schluessel
///
/// Clone teilt den Schluessel. Beide Richtungen duerfen parallel aus
/// mehreren Tasks aufgerufen werden.
#[derive(Clone, Debug)]
pub struct NachrichtenCodec {
    schluessel: Arc<SymmetrischerSchluessel>,
}

impl NachrichtenCodec {
    /// Erstellt einen Codec und prueft die Schluessel-Laenge
    pub fn neu(schluessel: SymmetrischerSchluessel) -> CryptoResult<Self> {
        pruefe_laenge(schluessel.len())?;
        Ok(Self {
            schluessel: Arc::new(schluessel),
        })
    }

    /// Verschluesselt eine Klartext-Nachricht in die Wire-Form
    pub fn verschluesseln(&self, klartext: &str) -> CryptoResult<String> {
        let mut nonce = [0u8; NONCE_LAENGE];
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(|e| CryptoError::Zufall(e.to_string()))?;

        let versiegelt = versiegeln(self.schluessel.as_bytes(), &nonce, klartext.as_bytes())?;

        let mut wire = Vec::with_capacity(NONCE_LAENGE + versiegelt.len());
        wire.extend_from_slice(&nonce);
        wire.extend_from_slice(&versiegelt);
        Ok(STANDARD.encode(wire))
    }

    /// Entschluesselt eine Nachricht in Wire-Form
    ///
    /// Schlaegt mit `Format` fehl wenn base64 oder Laenge nicht stimmen,
    /// mit `Authentifizierung` wenn der Auth-Tag nicht verifiziert.
    pub fn entschluesseln(&self, wire: &str) -> CryptoResult<String> {
        let daten = STANDARD
            .decode(wire.trim_end())
            .map_err(|e| CryptoError::Format(format!("base64: {e}")))?;

        if daten.len() < NONCE_LAENGE {
            return Err(CryptoError::Format(format!(
                "Nachricht zu kurz: {} Bytes, mindestens {NONCE_LAENGE} erwartet",
                daten.len()
            )));
        }

        let (nonce, versiegelt) = daten.split_at(NONCE_LAENGE);
        let klartext = oeffnen(self.schluessel.as_bytes(), nonce, versiegelt)?;

        String::from_utf8(klartext)
            .map_err(|_| CryptoError::Format("Klartext ist kein gueltiges UTF-8".into()))
    }

    /// Entschluesselt rohe Bytes wie sie aus dem Data Channel kommen
    pub fn entschluesseln_bytes(&self, daten: &[u8]) -> CryptoResult<String> {
        let text = std::str::from_utf8(daten)
            .map_err(|_| CryptoError::Format("Wire-Form ist kein gueltiges UTF-8".into()))?;
        self.entschluesseln(text)
    }
}

fn versiegeln(schluessel: &[u8], nonce: &[u8], klartext: &[u8]) -> CryptoResult<Vec<u8>> {
    let nonce = Nonce::<U12>::from_slice(nonce);
    let ergebnis = match schluessel.len() {
        16 => Aes128Gcm::new_from_slice(schluessel)
            .map_err(|_| laengenfehler(schluessel))?
            .encrypt(nonce, klartext),
        24 => Aes192Gcm::new_from_slice(schluessel)
            .map_err(|_| laengenfehler(schluessel))?
            .encrypt(nonce, klartext),
        32 => Aes256Gcm::new_from_slice(schluessel)
            .map_err(|_| laengenfehler(schluessel))?
            .encrypt(nonce, klartext),
        _ => return Err(laengenfehler(schluessel)),
    };
    ergebnis.map_err(|e| CryptoError::Verschluesselung(e.to_string()))
}

fn oeffnen(schluessel: &[u8], nonce: &[u8], versiegelt: &[u8]) -> CryptoResult<Vec<u8>> {
    let nonce = Nonce::<U12>::from_slice(nonce);
    let ergebnis = match schluessel.len() {
        16 => Aes128Gcm::new_from_slice(schluessel)
            .map_err(|_| laengenfehler(schluessel))?
            .decrypt(nonce, versiegelt),
        24 => Aes192Gcm::new_from_slice(schluessel)
            .map_err(|_| laengenfehler(schluessel))?
            .decrypt(nonce, versiegelt),
        32 => Aes256Gcm::new_from_slice(schluessel)
            .map_err(|_| laengenfehler(schluessel))?
            .decrypt(nonce, versiegelt),
        _ => return Err(laengenfehler(schluessel)),
    };
    ergebnis.map_err(|_| CryptoError::Authentifizierung)
}

fn laengenfehler(schluessel: &[u8]) -> CryptoError {
    CryptoError::UngueltigeSchluesselLaenge {
        erhalten: schluessel.len(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
