//! Client-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Ohne Datei gelten die
//! Standardwerte; nur der Schluessel muss immer gesetzt werden.

use anyhow::Context;
use fluesterpost_core::RaumId;
use fluesterpost_observability::logging::{log_format_gueltig, log_level_gueltig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Vollstaendige Client-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Relay-Einstellungen
    pub relay: RelayEinstellungen,
    /// WebRTC-Einstellungen
    pub webrtc: WebRtcEinstellungen,
    /// Handshake-Einstellungen
    pub handshake: HandshakeEinstellungen,
    /// Schluessel-Einstellungen
    pub sicherheit: SicherheitsEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Relay-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayEinstellungen {
    /// WebSocket-URL des Relays
    pub url: String,
    /// Raum am Relay (leer = Standard-Raum)
    pub raum: Option<String>,
}

impl Default for RelayEinstellungen {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080/ws".into(),
            raum: None,
        }
    }
}

/// WebRTC-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebRtcEinstellungen {
    /// STUN-Server fuer die Kandidaten-Sammlung
    pub stun_server: Vec<String>,
}

impl Default for WebRtcEinstellungen {
    fn default() -> Self {
        Self {
            stun_server: vec!["stun:stun.l.google.com:19302".into()],
        }
    }
}

/// Handshake-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandshakeEinstellungen {
    /// Zeitlimit pro Wartephase in Sekunden
    pub timeout_sek: u64,
}

impl Default for HandshakeEinstellungen {
    fn default() -> Self {
        Self { timeout_sek: 60 }
    }
}

/// Schluessel-Einstellungen
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SicherheitsEinstellungen {
    /// Geteilter Schluessel: `base64:<...>` oder 16/24/32 Zeichen Klartext
    pub schluessel: Option<String>,
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "text".into(),
        }
    }
}

impl ClientConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                config.validieren()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Prueft Werte, die serde allein nicht abdeckt
    pub fn validieren(&self) -> anyhow::Result<()> {
        if self.handshake.timeout_sek == 0 {
            anyhow::bail!("handshake.timeout_sek muss groesser als 0 sein");
        }
        if !log_level_gueltig(&self.logging.level) {
            anyhow::bail!("Ungueltiges Log-Level: '{}'", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            anyhow::bail!("Ungueltiges Log-Format: '{}'", self.logging.format);
        }
        Ok(())
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake.timeout_sek)
    }

    /// Vollstaendige Relay-URL inklusive Raum
    pub fn relay_url(&self) -> anyhow::Result<String> {
        let basis = self.relay.url.trim_end_matches('/');
        match self.relay.raum.as_deref() {
            None | Some("") => Ok(basis.to_string()),
            Some(raum) => {
                let raum = RaumId::neu(raum).context("Ungueltiger Raum")?;
                Ok(format!("{basis}/{raum}"))
            }
        }
    }
}
