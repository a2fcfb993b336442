//! WebSocket-Listener – Bindet Socket, akzeptiert Signaling-Verbindungen
//!
//! Der `RelayServer` bedient zwei Endpunkte:
//! - `GET /ws`         – Verbindung im Standard-Raum
//! - `GET /ws/{raum}`  – Verbindung in einem benannten Raum
//!
//! Jede akzeptierte Verbindung laeuft als eigene `RelayVerbindung` in einem
//! tokio-Task. Beim Shutdown werden alle Verbindungen aus dem Hub entfernt.

use axum::{
    extract::{ConnectInfo, Path, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use fluesterpost_core::RaumId;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use crate::connection::RelayVerbindung;
use crate::error::SignalingResult;
use crate::hub::RelayHub;

/// Geteilter Zustand der WebSocket-Handler
#[derive(Clone)]
struct RelayAppState {
    hub: RelayHub,
    shutdown_rx: watch::Receiver<bool>,
}

/// WebSocket-Signaling-Relay
pub struct RelayServer {
    hub: RelayHub,
    bind_addr: SocketAddr,
}

impl RelayServer {
    /// Erstellt einen neuen RelayServer
    pub fn neu(hub: RelayHub, bind_addr: SocketAddr) -> Self {
        Self { hub, bind_addr }
    }

    /// Router mit den WebSocket-Endpunkten
    pub fn router(&self, shutdown_rx: watch::Receiver<bool>) -> Router {
        Router::new()
            .route("/ws", get(ws_standard))
            .route("/ws/:raum", get(ws_raum))
            .layer(TraceLayer::new_for_http())
            .with_state(RelayAppState {
                hub: self.hub.clone(),
                shutdown_rx,
            })
    }

    /// Bindet den Listener und bedient Verbindungen
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
    pub async fn starten(self, shutdown_rx: watch::Receiver<bool>) -> SignalingResult<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        self.mit_listener_starten(listener, shutdown_rx).await
    }

    /// Bedient Verbindungen auf einem bereits gebundenen Listener
    pub async fn mit_listener_starten(
        self,
        listener: TcpListener,
        shutdown_rx: watch::Receiver<bool>,
    ) -> SignalingResult<()> {
        let lokale_addr = listener.local_addr()?;
        tracing::info!(adresse = %lokale_addr, "Signaling-Relay gestartet");

        let app = self.router(shutdown_rx.clone());
        let mut signal_rx = shutdown_rx;

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            while signal_rx.changed().await.is_ok() {
                if *signal_rx.borrow() {
                    break;
                }
            }
        })
        .await?;

        let getrennt = self.hub.alle_trennen();
        tracing::info!(getrennt, "Signaling-Relay gestoppt");
        Ok(())
    }
}

/// `GET /ws` – Verbindung im Standard-Raum
async fn ws_standard(
    ws: WebSocketUpgrade,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    State(state): State<RelayAppState>,
) -> Response {
    upgrade(ws, peer_addr, state, RaumId::standard())
}

/// `GET /ws/{raum}` – Verbindung in einem benannten Raum
async fn ws_raum(
    ws: WebSocketUpgrade,
    Path(raum): Path<String>,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    State(state): State<RelayAppState>,
) -> Response {
    match RaumId::neu(raum) {
        Ok(raum) => upgrade(ws, peer_addr, state, raum),
        Err(e) => {
            tracing::warn!(peer = %peer_addr, fehler = %e, "Verbindung mit ungueltigem Raum abgelehnt");
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

fn upgrade(ws: WebSocketUpgrade, peer_addr: SocketAddr, state: RelayAppState, raum: RaumId) -> Response {
    let RelayAppState { hub, shutdown_rx } = state;
    ws.on_upgrade(move |socket| async move {
        RelayVerbindung::neu(hub, raum, peer_addr)
            .verarbeiten(socket, shutdown_rx)
            .await;
    })
}
