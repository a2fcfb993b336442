//! Produktive Verhandlung ueber den `webrtc`-Crate
//!
//! Die Callbacks der Bibliothek (`on_data_channel`, `on_open`, `on_message`,
//! `on_close`) leiten nur in Kanaele weiter. Der Handshake-Treiber wartet
//! auf diese Kanaele, nie per Polling.
//!
//! Kandidaten werden nicht einzeln ausgetauscht: die lokale Beschreibung wird
//! erst nach abgeschlossener Sammlung versendet und enthaelt alle Kandidaten.

use async_trait::async_trait;
use fluesterpost_core::{BeschreibungsTyp, SitzungsBeschreibung};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;

use crate::error::{SessionError, SessionResult};
use crate::verhandlung::{DatenKanal, Verhandlung};

/// Puffer fuer eingehende Data-Channel-Nachrichten
const NACHRICHTEN_PUFFER: usize = 256;

// ---------------------------------------------------------------------------
// WebRtcVerhandlung
// ---------------------------------------------------------------------------

/// Eine Peer-Verbindung des `webrtc`-Crates hinter dem `Verhandlung`-Trait
pub struct WebRtcVerhandlung {
    pc: Arc<RTCPeerConnection>,
    sammlung: tokio::sync::Mutex<Option<mpsc::Receiver<()>>>,
    eingehend: tokio::sync::Mutex<mpsc::Receiver<Arc<WebRtcDatenKanal>>>,
}

impl WebRtcVerhandlung {
    /// Erstellt eine neue Peer-Verbindung mit den gegebenen STUN-Servern
    ///
    /// Eine leere Liste beschraenkt die Sammlung auf Host-Kandidaten.
    pub async fn neu(stun_server: &[String]) -> SessionResult<Self> {
        let mut medien = MediaEngine::default();
        medien.register_default_codecs().map_err(setup_fehler)?;

        let registry =
            register_default_interceptors(Registry::new(), &mut medien).map_err(setup_fehler)?;

        let api = APIBuilder::new()
            .with_media_engine(medien)
            .with_interceptor_registry(registry)
            .build();

        let config = RTCConfiguration {
            ice_servers: stun_server
                .iter()
                .map(|url| RTCIceServer {
                    urls: vec![url.clone()],
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let pc = Arc::new(api.new_peer_connection(config).await.map_err(setup_fehler)?);

        pc.on_peer_connection_state_change(Box::new(|zustand: RTCPeerConnectionState| {
            tracing::info!(zustand = %zustand, "Peer-Verbindungszustand geaendert");
            Box::pin(async {})
        }));

        // Vor jeder Remote-Beschreibung registrieren, sonst geht der Kanal verloren
        let (eingehend_tx, eingehend_rx) = mpsc::channel(1);
        pc.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let eingehend_tx = eingehend_tx.clone();
            Box::pin(async move {
                tracing::info!(label = %dc.label(), "Eingehender Data Channel");
                let kanal = Arc::new(WebRtcDatenKanal::neu(dc));
                if eingehend_tx.try_send(kanal).is_err() {
                    tracing::warn!("Weiterer eingehender Data Channel ignoriert");
                }
            })
        }));

        Ok(Self {
            pc,
            sammlung: tokio::sync::Mutex::new(None),
            eingehend: tokio::sync::Mutex::new(eingehend_rx),
        })
    }
}

#[async_trait]
impl Verhandlung for WebRtcVerhandlung {
    async fn lokalen_kanal_erstellen(&self, label: &str) -> SessionResult<Arc<dyn DatenKanal>> {
        let dc = self
            .pc
            .create_data_channel(label, None)
            .await
            .map_err(verhandlungs_fehler)?;
        Ok(Arc::new(WebRtcDatenKanal::neu(dc)))
    }

    async fn angebot_erstellen(&self) -> SessionResult<SitzungsBeschreibung> {
        let angebot = self
            .pc
            .create_offer(None)
            .await
            .map_err(verhandlungs_fehler)?;
        aus_rtc(angebot)
    }

    async fn antwort_erstellen(&self) -> SessionResult<SitzungsBeschreibung> {
        let antwort = self
            .pc
            .create_answer(None)
            .await
            .map_err(verhandlungs_fehler)?;
        aus_rtc(antwort)
    }

    async fn lokale_beschreibung_setzen(
        &self,
        beschreibung: SitzungsBeschreibung,
    ) -> SessionResult<()> {
        let beschreibung = zu_rtc(beschreibung)?;

        // Promise muss vor set_local_description existieren
        let sammlung = self.pc.gathering_complete_promise().await;
        *self.sammlung.lock().await = Some(sammlung);

        self.pc
            .set_local_description(beschreibung)
            .await
            .map_err(verhandlungs_fehler)
    }

    async fn remote_beschreibung_setzen(
        &self,
        beschreibung: SitzungsBeschreibung,
    ) -> SessionResult<()> {
        let beschreibung = zu_rtc(beschreibung)?;
        self.pc
            .set_remote_description(beschreibung)
            .await
            .map_err(verhandlungs_fehler)
    }

    async fn sammlung_abwarten(&self) -> SessionResult<()> {
        let sammlung = self.sammlung.lock().await.take();
        match sammlung {
            Some(mut sammlung) => {
                // Fertig bei Signal oder geschlossenem Kanal
                let _ = sammlung.recv().await;
                tracing::debug!("ICE-Sammlung abgeschlossen");
                Ok(())
            }
            None => Err(SessionError::verhandlung(
                "Sammlung ohne lokale Beschreibung abgewartet",
            )),
        }
    }

    async fn lokale_beschreibung(&self) -> SessionResult<SitzungsBeschreibung> {
        let beschreibung = self
            .pc
            .local_description()
            .await
            .ok_or_else(|| SessionError::verhandlung("Keine lokale Beschreibung vorhanden"))?;
        aus_rtc(beschreibung)
    }

    async fn eingehenden_kanal_abwarten(&self) -> SessionResult<Arc<dyn DatenKanal>> {
        let kanal = self
            .eingehend
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| SessionError::kanal("Peer-Verbindung beendet bevor ein Kanal kam"))?;
        Ok(kanal)
    }

    async fn schliessen(&self) -> SessionResult<()> {
        self.pc.close().await.map_err(verhandlungs_fehler)
    }
}

// ---------------------------------------------------------------------------
// WebRtcDatenKanal
// ---------------------------------------------------------------------------

/// Data Channel des `webrtc`-Crates hinter dem `DatenKanal`-Trait
pub struct WebRtcDatenKanal {
    dc: Arc<RTCDataChannel>,
    offen_rx: watch::Receiver<bool>,
    nachrichten_rx: Mutex<Option<mpsc::Receiver<Vec<u8>>>>,
}

impl WebRtcDatenKanal {
    /// Registriert die Callbacks und kapselt den Kanal
    pub fn neu(dc: Arc<RTCDataChannel>) -> Self {
        let (offen_tx, offen_rx) =
            watch::channel(dc.ready_state() == RTCDataChannelState::Open);

        let label = dc.label().to_string();
        dc.on_open(Box::new(move || {
            tracing::info!(label = %label, "Data Channel offen");
            offen_tx.send_replace(true);
            Box::pin(async {})
        }));

        let (nachrichten_tx, nachrichten_rx) = mpsc::channel(NACHRICHTEN_PUFFER);
        let eingang = Arc::new(Mutex::new(Some(nachrichten_tx)));

        let eingang_nachricht = Arc::clone(&eingang);
        dc.on_message(Box::new(move |nachricht: DataChannelMessage| {
            let tx = eingang_nachricht.lock().clone();
            Box::pin(async move {
                if let Some(tx) = tx {
                    if tx.send(nachricht.data.to_vec()).await.is_err() {
                        tracing::trace!("Nachricht nach Ende des Lesers verworfen");
                    }
                }
            })
        }));

        // Schliessen beendet den Nachrichtenstrom
        let eingang_schliessen = Arc::clone(&eingang);
        dc.on_close(Box::new(move || {
            tracing::info!("Data Channel geschlossen");
            eingang_schliessen.lock().take();
            Box::pin(async {})
        }));

        Self {
            dc,
            offen_rx,
            nachrichten_rx: Mutex::new(Some(nachrichten_rx)),
        }
    }
}

#[async_trait]
impl DatenKanal for WebRtcDatenKanal {
    fn label(&self) -> String {
        self.dc.label().to_string()
    }

    async fn offen_abwarten(&self) -> SessionResult<()> {
        let mut offen_rx = self.offen_rx.clone();
        offen_rx
            .wait_for(|offen| *offen)
            .await
            .map(|_| ())
            .map_err(|_| SessionError::kanal("Kanal vor dem Oeffnen verworfen"))
    }

    async fn text_senden(&self, text: &str) -> SessionResult<()> {
        self.dc
            .send_text(text.to_string())
            .await
            .map(|_| ())
            .map_err(|e| SessionError::kanal(e.to_string()))
    }

    fn nachrichten(&self) -> Option<mpsc::Receiver<Vec<u8>>> {
        self.nachrichten_rx.lock().take()
    }
}

// ---------------------------------------------------------------------------
// Konvertierung
// ---------------------------------------------------------------------------

fn zu_rtc(beschreibung: SitzungsBeschreibung) -> SessionResult<RTCSessionDescription> {
    let ergebnis = match beschreibung.typ {
        BeschreibungsTyp::Offer => RTCSessionDescription::offer(beschreibung.sdp),
        BeschreibungsTyp::Answer => RTCSessionDescription::answer(beschreibung.sdp),
        BeschreibungsTyp::Pranswer => RTCSessionDescription::pranswer(beschreibung.sdp),
        BeschreibungsTyp::Rollback => {
            return Err(SessionError::verhandlung("Rollback wird nicht unterstuetzt"))
        }
    };
    ergebnis.map_err(|e| SessionError::verhandlung(format!("SDP ungueltig: {e}")))
}

fn aus_rtc(beschreibung: RTCSessionDescription) -> SessionResult<SitzungsBeschreibung> {
    let typ = match beschreibung.sdp_type {
        RTCSdpType::Offer => BeschreibungsTyp::Offer,
        RTCSdpType::Answer => BeschreibungsTyp::Answer,
        RTCSdpType::Pranswer => BeschreibungsTyp::Pranswer,
        RTCSdpType::Rollback => BeschreibungsTyp::Rollback,
        RTCSdpType::Unspecified => {
            return Err(SessionError::verhandlung("Beschreibung ohne Typ"));
        }
    };
    Ok(SitzungsBeschreibung::neu(typ, beschreibung.sdp))
}

fn setup_fehler(e: webrtc::Error) -> SessionError {
    SessionError::TransportSetup(e.to_string())
}

fn verhandlungs_fehler(e: webrtc::Error) -> SessionError {
    SessionError::Verhandlung(e.to_string())
}
