//! fluesterpost-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die Bausteine bereit, die Relay, Client und
//! Handshake-Treiber gemeinsam nutzen: Rollen, Raum- und Verbindungs-IDs
//! sowie das JSON-Format der Sitzungsbeschreibungen.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{FluesterpostError, Result};
pub use types::{BeschreibungsTyp, RaumId, Rolle, SitzungsBeschreibung, VerbindungsId};
