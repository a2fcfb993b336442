//! Laden des geteilten Schluessels
//!
//! Reihenfolge: Umgebungsvariable `FLUESTERPOST_KEY`, dann
//! `[sicherheit] schluessel` aus der Konfiguration. Ohne gueltigen
//! Schluessel startet der Client nicht.

use anyhow::{bail, Context, Result};
use fluesterpost_crypto::SymmetrischerSchluessel;

/// Umgebungsvariable fuer den geteilten Schluessel
pub const SCHLUESSEL_ENV: &str = "FLUESTERPOST_KEY";

/// Laenge neu erzeugter Schluessel (AES-256)
pub const NEUER_SCHLUESSEL_LAENGE: usize = 32;

/// Waehlt den Schluessel aus Umgebung oder Konfiguration
pub fn schluessel_laden(
    aus_umgebung: Option<&str>,
    aus_konfiguration: Option<&str>,
) -> Result<SymmetrischerSchluessel> {
    let (quelle, wert) = match (aus_umgebung, aus_konfiguration) {
        (Some(wert), _) if !wert.is_empty() => (SCHLUESSEL_ENV, wert),
        (_, Some(wert)) if !wert.is_empty() => ("[sicherheit] schluessel", wert),
        _ => bail!(
            "Kein Schluessel gesetzt: {SCHLUESSEL_ENV} oder [sicherheit] schluessel angeben \
             (neuen Schluessel mit --generate-key erzeugen)"
        ),
    };

    SymmetrischerSchluessel::aus_konfiguration(wert)
        .with_context(|| format!("Ungueltiger Schluessel aus {quelle}"))
}

/// Erzeugt einen neuen Schluessel in Konfigurationsform (`base64:...`)
pub fn schluessel_erzeugen() -> Result<String> {
    let schluessel = SymmetrischerSchluessel::zufaellig(NEUER_SCHLUESSEL_LAENGE)?;
    Ok(schluessel.als_konfiguration())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn umgebung_hat_vorrang() {
        let schluessel =
            schluessel_laden(Some("0123456789abcdef"), Some("base64:kaputt")).unwrap();
        assert_eq!(schluessel.len(), 16);
    }

    #[test]
    fn konfiguration_als_rueckfall() {
        let erzeugt = schluessel_erzeugen().unwrap();
        let schluessel = schluessel_laden(None, Some(&erzeugt)).unwrap();
        assert_eq!(schluessel.len(), NEUER_SCHLUESSEL_LAENGE);

        let schluessel = schluessel_laden(Some(""), Some(&erzeugt)).unwrap();
        assert_eq!(schluessel.len(), NEUER_SCHLUESSEL_LAENGE);
    }

    #[test]
    fn fehlender_schluessel_ist_fehler() {
        let fehler = schluessel_laden(None, None).unwrap_err();
        assert!(fehler.to_string().contains(SCHLUESSEL_ENV));
    }

    #[test]
    fn falsche_laenge_ist_fehler() {
        assert!(schluessel_laden(Some("zu kurz"), None).is_err());
        assert!(schluessel_laden(None, Some("base64:AAAA")).is_err());
    }

    #[test]
    fn erzeugte_schluessel_unterscheiden_sich() {
        assert_ne!(schluessel_erzeugen().unwrap(), schluessel_erzeugen().unwrap());
    }
}
