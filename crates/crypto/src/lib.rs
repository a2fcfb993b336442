//! # fluesterpost-crypto
//!
//! Ende-zu-Ende Verschluesselung der Chat-Nachrichten. Der Relay-Server und
//! der Data Channel sehen nur die Wire-Form.
//!
//! ## Module
//! - `codec` - AES-GCM Nachrichten-Codec (verschluesseln / entschluesseln)
//! - `types` - Schluessel-Container (wird beim Drop genullt)
//! - `error` - Fehlertypen

pub mod codec;
pub mod error;
pub mod types;

// Bequeme Re-Exports
pub use codec::{NachrichtenCodec, NONCE_LAENGE, TAG_LAENGE};
pub use error::{CryptoError, CryptoResult};
pub use types::{SymmetrischerSchluessel, GUELTIGE_SCHLUESSEL_LAENGEN};
