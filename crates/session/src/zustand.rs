//! Handshake-Zustaende und erlaubte Uebergaenge
//!
//! ```text
//! Initiator: Leerlauf -> LokaleBeschreibungBereit -> WartetAufRemoteBeschreibung
//!                     -> RemoteBeschreibungGesetzt -> KanalOffen
//! Responder: Leerlauf -> WartetAufRemoteBeschreibung -> RemoteBeschreibungGesetzt
//!                     -> LokaleBeschreibungBereit -> KanalOffen
//! ```
//!
//! Jeder nicht-terminale Zustand darf nach `Fehlgeschlagen` wechseln.

use crate::error::{SessionError, SessionResult};

/// Zustand eines Handshakes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HandshakeZustand {
    #[default]
    Leerlauf,
    /// Lokale Beschreibung gesetzt und Kandidaten gesammelt
    LokaleBeschreibungBereit,
    /// Lauscht am Relay auf die Beschreibung der Gegenseite
    WartetAufRemoteBeschreibung,
    RemoteBeschreibungGesetzt,
    /// Data Channel offen, Handshake abgeschlossen
    KanalOffen,
    Fehlgeschlagen(String),
}

impl HandshakeZustand {
    /// Prueft ob der Zustand terminal ist
    pub fn ist_terminal(&self) -> bool {
        matches!(self, Self::KanalOffen | Self::Fehlgeschlagen(_))
    }

    /// Kurzname fuer Logs und Fehlermeldungen
    pub fn name(&self) -> &'static str {
        match self {
            Self::Leerlauf => "Leerlauf",
            Self::LokaleBeschreibungBereit => "LokaleBeschreibungBereit",
            Self::WartetAufRemoteBeschreibung => "WartetAufRemoteBeschreibung",
            Self::RemoteBeschreibungGesetzt => "RemoteBeschreibungGesetzt",
            Self::KanalOffen => "KanalOffen",
            Self::Fehlgeschlagen(_) => "Fehlgeschlagen",
        }
    }

    /// Prueft einen Wechsel nach `nach` und gibt den neuen Zustand zurueck
    pub fn uebergang(&self, nach: HandshakeZustand) -> SessionResult<HandshakeZustand> {
        use HandshakeZustand::*;

        let erlaubt = match (self, &nach) {
            (KanalOffen | Fehlgeschlagen(_), _) => false,
            (_, Fehlgeschlagen(_)) => true,
            (Leerlauf, LokaleBeschreibungBereit) => true,
            (Leerlauf, WartetAufRemoteBeschreibung) => true,
            (LokaleBeschreibungBereit, WartetAufRemoteBeschreibung) => true,
            (LokaleBeschreibungBereit, KanalOffen) => true,
            (WartetAufRemoteBeschreibung, RemoteBeschreibungGesetzt) => true,
            (RemoteBeschreibungGesetzt, LokaleBeschreibungBereit) => true,
            (RemoteBeschreibungGesetzt, KanalOffen) => true,
            _ => false,
        };

        if erlaubt {
            Ok(nach)
        } else {
            Err(SessionError::UngueltigerUebergang {
                von: self.name().to_string(),
                nach: nach.name().to_string(),
            })
        }
    }
}

impl std::fmt::Display for HandshakeZustand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fehlgeschlagen(grund) => write!(f, "Fehlgeschlagen({grund})"),
            anderer => f.write_str(anderer.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::HandshakeZustand::*;
    use super::*;

    fn kette(start: HandshakeZustand, schritte: &[HandshakeZustand]) -> SessionResult<HandshakeZustand> {
        schritte
            .iter()
            .cloned()
            .try_fold(start, |zustand, nach| zustand.uebergang(nach))
    }

    #[test]
    fn initiator_pfad_ist_gueltig() {
        let ende = kette(
            Leerlauf,
            &[
                LokaleBeschreibungBereit,
                WartetAufRemoteBeschreibung,
                RemoteBeschreibungGesetzt,
                KanalOffen,
            ],
        )
        .unwrap();
        assert_eq!(ende, KanalOffen);
    }

    #[test]
    fn responder_pfad_ist_gueltig() {
        let ende = kette(
            Leerlauf,
            &[
                WartetAufRemoteBeschreibung,
                RemoteBeschreibungGesetzt,
                LokaleBeschreibungBereit,
                KanalOffen,
            ],
        )
        .unwrap();
        assert_eq!(ende, KanalOffen);
    }

    #[test]
    fn ueberspringen_ist_ungueltig() {
        assert!(matches!(
            Leerlauf.uebergang(KanalOffen),
            Err(SessionError::UngueltigerUebergang { .. })
        ));
        assert!(WartetAufRemoteBeschreibung.uebergang(KanalOffen).is_err());
    }

    #[test]
    fn terminale_zustaende_bleiben_terminal() {
        assert!(KanalOffen.uebergang(Leerlauf).is_err());
        assert!(KanalOffen.uebergang(Fehlgeschlagen("x".into())).is_err());
        assert!(Fehlgeschlagen("x".into())
            .uebergang(WartetAufRemoteBeschreibung)
            .is_err());
        assert!(KanalOffen.ist_terminal());
        assert!(!RemoteBeschreibungGesetzt.ist_terminal());
    }

    #[test]
    fn fehlschlag_aus_jedem_laufenden_zustand() {
        for zustand in [
            Leerlauf,
            LokaleBeschreibungBereit,
            WartetAufRemoteBeschreibung,
            RemoteBeschreibungGesetzt,
        ] {
            assert!(zustand.uebergang(Fehlgeschlagen("Timeout".into())).is_ok());
        }
    }

    #[test]
    fn anzeige() {
        assert_eq!(Leerlauf.to_string(), "Leerlauf");
        assert_eq!(
            Fehlgeschlagen("Relay weg".into()).to_string(),
            "Fehlgeschlagen(Relay weg)"
        );
    }
}
