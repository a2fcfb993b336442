//! Relay-Verbindung – Verwaltet eine einzelne WebSocket-Verbindung
//!
//! Jede WebSocket-Verbindung bekommt eine `RelayVerbindung` in einem eigenen
//! tokio-Task. Der Task registriert sich im Hub, startet einen Schreib-Task
//! fuer die Send-Queue und liest danach Frames bis zum Ende der Verbindung.
//!
//! ## Ablauf
//! ```text
//! verbinden (Hub) -> lesen/weiterleiten ... -> trennen (Hub) -> Close-Frame
//! ```
//!
//! Text-Frames werden unveraendert als Text weitergeleitet, Binaer-Frames
//! als Binaer. Ping/Pong beantwortet axum selbst.

use axum::extract::ws::{Message, WebSocket};
use fluesterpost_core::{RaumId, VerbindungsId};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use crate::hub::{RelayHub, RelayPayload};

/// Wie lange nach dem Trennen auf das Leeren der Send-Queue gewartet wird
const SCHREIB_NACHLAUF: Duration = Duration::from_secs(2);

/// Eine einzelne Signaling-Verbindung am Relay
pub struct RelayVerbindung {
    hub: RelayHub,
    raum: RaumId,
    peer_addr: SocketAddr,
}

impl RelayVerbindung {
    /// Erstellt eine neue Verbindung fuer den gegebenen Raum
    pub fn neu(hub: RelayHub, raum: RaumId, peer_addr: SocketAddr) -> Self {
        Self {
            hub,
            raum,
            peer_addr,
        }
    }

    /// Verarbeitet die Verbindung bis zum Ende
    ///
    /// Endet wenn der Client trennt, ein Lese-Fehler auftritt, der
    /// Schreib-Task aufgibt oder `shutdown_rx` ein `true`-Signal empfaengt.
    /// Die Verbindung ist danach garantiert aus dem Hub entfernt.
    pub async fn verarbeiten(self, socket: WebSocket, mut shutdown_rx: watch::Receiver<bool>) {
        let peer_addr = self.peer_addr;
        let raum = self.raum.clone();
        let (id, queue) = self.hub.verbinden(&raum);

        tracing::info!(peer = %peer_addr, verbindung = %id, raum = %raum, "Neue Signaling-Verbindung");

        let (ws_tx, mut ws_rx) = socket.split();
        let mut schreiber = tokio::spawn(schreib_task(ws_tx, queue, id));
        let mut schreiber_beendet = false;

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                frame = ws_rx.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            self.hub.weiterleiten(&raum, id, RelayPayload::Text(text));
                        }
                        Some(Ok(Message::Binary(daten))) => {
                            self.hub.weiterleiten(&raum, id, RelayPayload::Binaer(daten));
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::info!(peer = %peer_addr, verbindung = %id, "Verbindung vom Client getrennt");
                            break;
                        }
                        Some(Ok(_)) => {
                            // Ping/Pong
                        }
                        Some(Err(e)) => {
                            tracing::warn!(
                                peer = %peer_addr,
                                verbindung = %id,
                                fehler = %e,
                                "WebSocket-Lesefehler"
                            );
                            break;
                        }
                    }
                }

                _ = &mut schreiber => {
                    // Send-Queue geschlossen (vom Hub entfernt) oder Schreibfehler
                    tracing::debug!(peer = %peer_addr, verbindung = %id, "Schreib-Task beendet");
                    schreiber_beendet = true;
                    break;
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer_addr, verbindung = %id, "Shutdown-Signal – Verbindung wird getrennt");
                        break;
                    }
                }
            }
        }

        // Entfernen schliesst die Send-Queue, der Schreib-Task schickt Close
        self.hub.trennen(&raum, &id);

        if !schreiber_beendet {
            let abbruch = schreiber.abort_handle();
            if tokio::time::timeout(SCHREIB_NACHLAUF, schreiber).await.is_err() {
                abbruch.abort();
            }
        }

        tracing::info!(peer = %peer_addr, verbindung = %id, "Verbindungs-Task beendet");
    }
}

/// Leert die Send-Queue einer Verbindung in den WebSocket
async fn schreib_task(
    mut ws_tx: futures_util::stream::SplitSink<WebSocket, Message>,
    mut queue: mpsc::Receiver<RelayPayload>,
    id: VerbindungsId,
) {
    while let Some(payload) = queue.recv().await {
        let nachricht = match payload {
            RelayPayload::Text(text) => Message::Text(text),
            RelayPayload::Binaer(daten) => Message::Binary(daten),
        };
        if let Err(e) = ws_tx.send(nachricht).await {
            tracing::warn!(verbindung = %id, fehler = %e, "WebSocket-Schreibfehler");
            return;
        }
    }

    // Queue geschlossen: Verbindung sauber beenden
    let _ = ws_tx.send(Message::Close(None)).await;
    let _ = ws_tx.close().await;
}
