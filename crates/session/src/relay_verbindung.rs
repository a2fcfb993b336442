//! WebSocket-Verbindung eines Peers zum Signaling-Relay

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crate::error::{SessionError, SessionResult};
use crate::verhandlung::SignalVerbindung;

/// `SignalVerbindung` ueber tokio-tungstenite
pub struct WsSignalVerbindung {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    url: String,
}

impl WsSignalVerbindung {
    /// Baut die WebSocket-Verbindung zum Relay auf
    pub async fn verbinden(url: &str) -> SessionResult<Self> {
        let (ws, _) = connect_async(url)
            .await
            .map_err(|e| SessionError::TransportSetup(format!("Relay {url}: {e}")))?;

        tracing::info!(relay = %url, "Mit Relay verbunden");
        Ok(Self {
            ws,
            url: url.to_string(),
        })
    }

    /// Schliesst die Verbindung mit Close-Frame
    pub async fn schliessen(&mut self) {
        if let Err(e) = self.ws.close(None).await {
            tracing::debug!(relay = %self.url, fehler = %e, "Relay-Verbindung nicht sauber geschlossen");
        }
    }
}

#[async_trait]
impl SignalVerbindung for WsSignalVerbindung {
    async fn senden(&mut self, text: String) -> SessionResult<()> {
        self.ws
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| SessionError::RelayGetrennt(e.to_string()))
    }

    async fn empfangen(&mut self) -> Option<SessionResult<String>> {
        loop {
            match self.ws.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Binary(daten)) => match String::from_utf8(daten.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => {
                        tracing::debug!(bytes = daten.len(), "Binaere Relay-Nachricht ignoriert");
                    }
                },
                Ok(Message::Close(_)) => return None,
                Ok(_) => {
                    // Ping/Pong/Frame
                }
                Err(e) => return Some(Err(SessionError::RelayGetrennt(e.to_string()))),
            }
        }
    }
}
