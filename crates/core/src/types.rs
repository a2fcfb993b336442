//! Gemeinsame Typen fuer Fluesterpost
//!
//! IDs verwenden das Newtype-Pattern, damit Raum- und Verbindungs-IDs zur
//! Compilezeit nicht verwechselt werden koennen.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{FluesterpostError, Result};

// ---------------------------------------------------------------------------
// VerbindungsId
// ---------------------------------------------------------------------------

/// Eindeutige ID einer Signaling-Verbindung am Relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerbindungsId(pub Uuid);

impl VerbindungsId {
    /// Erstellt eine neue zufaellige VerbindungsId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for VerbindungsId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for VerbindungsId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "verbindung:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// RaumId
// ---------------------------------------------------------------------------

/// Maximale Laenge einer Raum-ID
pub const RAUM_ID_MAX_LAENGE: usize = 64;

/// Name des Standard-Raums (Endpunkt `/ws` ohne Raum-Segment)
pub const STANDARD_RAUM: &str = "standard";

/// Broadcast-Domaene am Relay
///
/// Nur Verbindungen im selben Raum sehen die Nachrichten der anderen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RaumId(String);

impl RaumId {
    /// Validiert und erstellt eine Raum-ID
    pub fn neu(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let gueltig = !name.is_empty()
            && name.len() <= RAUM_ID_MAX_LAENGE
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if gueltig {
            Ok(Self(name))
        } else {
            Err(FluesterpostError::UngueltigeRaumId(name))
        }
    }

    /// Der Standard-Raum
    pub fn standard() -> Self {
        Self(STANDARD_RAUM.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RaumId {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Display for RaumId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RaumId {
    type Error = FluesterpostError;

    fn try_from(name: String) -> Result<Self> {
        Self::neu(name)
    }
}

impl From<RaumId> for String {
    fn from(raum: RaumId) -> Self {
        raum.0
    }
}

// ---------------------------------------------------------------------------
// Rolle
// ---------------------------------------------------------------------------

/// Rolle eines Client-Prozesses, fest fuer die gesamte Laufzeit
///
/// Der Initiator erstellt den Data Channel und sendet das Angebot,
/// der Responder wartet auf Angebot und Kanal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Rolle {
    #[default]
    #[serde(rename = "offer")]
    Initiator,
    #[serde(rename = "answer")]
    Responder,
}

impl Rolle {
    /// CLI-Name der Rolle
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Initiator => "offer",
            Self::Responder => "answer",
        }
    }

    /// Beschreibungstyp, den diese Rolle von der Gegenseite erwartet
    pub fn erwarteter_typ(&self) -> BeschreibungsTyp {
        match self {
            Self::Initiator => BeschreibungsTyp::Answer,
            Self::Responder => BeschreibungsTyp::Offer,
        }
    }
}

impl std::fmt::Display for Rolle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.als_str())
    }
}

impl FromStr for Rolle {
    type Err = FluesterpostError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "offer" => Ok(Self::Initiator),
            "answer" => Ok(Self::Responder),
            andere => Err(FluesterpostError::UngueltigeRolle(andere.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Sitzungsbeschreibung
// ---------------------------------------------------------------------------

/// Typ einer Sitzungsbeschreibung (SDP-Typ)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeschreibungsTyp {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

impl std::fmt::Display for BeschreibungsTyp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::Pranswer => "pranswer",
            Self::Rollback => "rollback",
        };
        f.write_str(name)
    }
}

/// Sitzungsbeschreibung wie sie ueber das Relay laeuft
///
/// Wire-Format: `{"type":"offer","sdp":"v=0..."}`. Das Relay selbst
/// interpretiert den Inhalt nicht.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitzungsBeschreibung {
    #[serde(rename = "type")]
    pub typ: BeschreibungsTyp,
    pub sdp: String,
}

impl SitzungsBeschreibung {
    pub fn neu(typ: BeschreibungsTyp, sdp: impl Into<String>) -> Self {
        Self { typ, sdp: sdp.into() }
    }

    /// Dekodiert eine Beschreibung aus einer Relay-Nachricht
    pub fn aus_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialisiert die Beschreibung fuer das Relay
    pub fn zu_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
