//! fluesterpost-signaling – WebSocket Signaling-Relay
//!
//! Dieser Crate implementiert das Relay, ueber das zwei Peers ihre
//! Sitzungsbeschreibungen austauschen. Das Relay ist blind: es parst keine
//! Nachrichten und leitet jeden Frame an alle anderen Verbindungen im
//! selben Raum weiter.
//!
//! ## Architektur
//!
//! ```text
//! HTTP Listener (RelayServer)
//!     |  GET /ws, GET /ws/{raum}  -> WebSocket-Upgrade
//!     v
//! RelayVerbindung (pro Verbindung ein Task + Schreib-Task)
//!     |
//!     v
//! RelayHub – Raum -> Verbindung -> Send-Queue, Fan-out per try_send
//! ```

pub mod connection;
pub mod error;
pub mod hub;
pub mod server;

// Bequeme Re-Exporte
pub use connection::RelayVerbindung;
pub use error::{SignalingError, SignalingResult};
pub use hub::{FanoutBericht, PeerSender, RelayHub, RelayPayload, STANDARD_QUEUE_GROESSE};
pub use server::RelayServer;
