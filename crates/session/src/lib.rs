//! fluesterpost-session – Handshake und verschluesselter Chat
//!
//! Ein Client-Prozess durchlaeuft genau eine Sitzung:
//!
//! ```text
//! WsSignalVerbindung (Relay)
//!     |  Angebot/Antwort als JSON
//!     v
//! HandshakeTreiber (Rolle: Initiator oder Responder)
//!     |  Verhandlung: WebRtcVerhandlung
//!     v
//! DatenKanal "chat" offen
//!     |
//!     v
//! ChatAdapter – Eingabe -> verschluesseln -> Kanal -> entschluesseln -> Ausgabe
//! ```

pub mod chat;
pub mod error;
pub mod handshake;
pub mod relay_verbindung;
pub mod rtc;
pub mod speicher;
pub mod verhandlung;
pub mod zustand;

// Bequeme Re-Exporte
pub use chat::{ChatAdapter, ChatSitzung, PEER_PRAEFIX};
pub use error::{SessionError, SessionResult};
pub use handshake::{HandshakeTreiber, STANDARD_HANDSHAKE_TIMEOUT};
pub use relay_verbindung::WsSignalVerbindung;
pub use rtc::{WebRtcDatenKanal, WebRtcVerhandlung};
pub use speicher::{SpeicherKanal, SpeicherSignal, SpeicherSignalGegenstelle, SpeicherVerhandlung};
pub use verhandlung::{DatenKanal, SignalVerbindung, Verhandlung, KANAL_LABEL};
pub use zustand::HandshakeZustand;
