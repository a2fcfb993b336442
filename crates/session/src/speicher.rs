//! In-Memory-Implementierungen der Transport-Traits
//!
//! Zwei `SpeicherVerhandlung`en aus [`SpeicherVerhandlung::paar`] sind
//! Ruecken an Ruecken verbunden: der Kanal des Initiators erscheint beim
//! Responder sobald dieser das Angebot anwendet, beide Kanaele oeffnen sich
//! wenn beide Seiten eine Remote-Beschreibung gesetzt haben.
//! Die Beschreibungen selbst muessen trotzdem ueber eine `SignalVerbindung`
//! laufen, so dass Treiber und Relay echt getestet werden.

use async_trait::async_trait;
use fluesterpost_core::{BeschreibungsTyp, SitzungsBeschreibung};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::error::{SessionError, SessionResult};
use crate::verhandlung::{DatenKanal, SignalVerbindung, Verhandlung};

/// Puffer pro Richtung eines Speicher-Kanals
const KANAL_PUFFER: usize = 100;

// ============================================================================
// SpeicherKanal
// ============================================================================

/// Data Channel ueber zwei mpsc-Kanaele
pub struct SpeicherKanal {
    label: String,
    offen_rx: watch::Receiver<bool>,
    tx: mpsc::Sender<Vec<u8>>,
    rx: Mutex<Option<mpsc::Receiver<Vec<u8>>>>,
}

impl SpeicherKanal {
    /// Erstellt ein verbundenes, sofort offenes Kanal-Paar
    pub fn paar(label: &str) -> (Self, Self) {
        let (_offen_tx, offen_rx) = watch::channel(true);
        Self::paar_mit_status(label, offen_rx)
    }

    fn paar_mit_status(label: &str, offen_rx: watch::Receiver<bool>) -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::channel(KANAL_PUFFER);
        let (tx_b, rx_b) = mpsc::channel(KANAL_PUFFER);

        let a = Self {
            label: label.to_string(),
            offen_rx: offen_rx.clone(),
            tx: tx_b,
            rx: Mutex::new(Some(rx_a)),
        };
        let b = Self {
            label: label.to_string(),
            offen_rx,
            tx: tx_a,
            rx: Mutex::new(Some(rx_b)),
        };
        (a, b)
    }

    /// Sendet rohe Bytes an die Gegenseite
    pub async fn bytes_senden(&self, daten: Vec<u8>) -> SessionResult<()> {
        if !*self.offen_rx.borrow() {
            return Err(SessionError::kanal("Kanal nicht offen"));
        }
        self.tx
            .send(daten)
            .await
            .map_err(|_| SessionError::kanal("Gegenseite geschlossen"))
    }
}

#[async_trait]
impl DatenKanal for SpeicherKanal {
    fn label(&self) -> String {
        self.label.clone()
    }

    async fn offen_abwarten(&self) -> SessionResult<()> {
        let mut offen_rx = self.offen_rx.clone();
        offen_rx
            .wait_for(|offen| *offen)
            .await
            .map(|_| ())
            .map_err(|_| SessionError::kanal("Verbindung vor dem Oeffnen verworfen"))
    }

    async fn text_senden(&self, text: &str) -> SessionResult<()> {
        self.bytes_senden(text.as_bytes().to_vec()).await
    }

    fn nachrichten(&self) -> Option<mpsc::Receiver<Vec<u8>>> {
        self.rx.lock().take()
    }
}

// ============================================================================
// SpeicherVerhandlung
// ============================================================================

/// Gemeinsamer Zustand zweier verbundener Verhandlungen
struct Leitung {
    remote_gesetzt: AtomicUsize,
    offen_tx: watch::Sender<bool>,
    ausstehender_kanal: Mutex<Option<Arc<SpeicherKanal>>>,
}

/// Verhandlung ohne Netzwerk, immer paarweise erstellt
pub struct SpeicherVerhandlung {
    name: &'static str,
    leitung: Arc<Leitung>,
    lokal: Mutex<Option<SitzungsBeschreibung>>,
    remote: Mutex<Option<SitzungsBeschreibung>>,
    eingehend_tx: mpsc::Sender<Arc<SpeicherKanal>>,
    eingehend_rx: tokio::sync::Mutex<mpsc::Receiver<Arc<SpeicherKanal>>>,
    sammlung_haengt: AtomicBool,
}

impl SpeicherVerhandlung {
    /// Erstellt zwei Ruecken an Ruecken verbundene Verhandlungen
    pub fn paar() -> (Arc<Self>, Arc<Self>) {
        let (offen_tx, _) = watch::channel(false);
        let leitung = Arc::new(Leitung {
            remote_gesetzt: AtomicUsize::new(0),
            offen_tx,
            ausstehender_kanal: Mutex::new(None),
        });
        (
            Arc::new(Self::neu("links", Arc::clone(&leitung))),
            Arc::new(Self::neu("rechts", leitung)),
        )
    }

    fn neu(name: &'static str, leitung: Arc<Leitung>) -> Self {
        let (eingehend_tx, eingehend_rx) = mpsc::channel(1);
        Self {
            name,
            leitung,
            lokal: Mutex::new(None),
            remote: Mutex::new(None),
            eingehend_tx,
            eingehend_rx: tokio::sync::Mutex::new(eingehend_rx),
            sammlung_haengt: AtomicBool::new(false),
        }
    }

    /// Laesst `sammlung_abwarten` nie fertig werden
    pub fn sammlung_blockieren(&self) {
        self.sammlung_haengt.store(true, Ordering::SeqCst);
    }

    /// Zuletzt angewendete Remote-Beschreibung
    pub fn remote(&self) -> Option<SitzungsBeschreibung> {
        self.remote.lock().clone()
    }

    fn beschreibung(&self, typ: BeschreibungsTyp) -> SitzungsBeschreibung {
        SitzungsBeschreibung::neu(typ, format!("v=0\r\no=speicher {} {typ}\r\n", self.name))
    }
}

#[async_trait]
impl Verhandlung for SpeicherVerhandlung {
    async fn lokalen_kanal_erstellen(&self, label: &str) -> SessionResult<Arc<dyn DatenKanal>> {
        let (lokal, fern) = SpeicherKanal::paar_mit_status(label, self.leitung.offen_tx.subscribe());
        *self.leitung.ausstehender_kanal.lock() = Some(Arc::new(fern));
        Ok(Arc::new(lokal))
    }

    async fn angebot_erstellen(&self) -> SessionResult<SitzungsBeschreibung> {
        Ok(self.beschreibung(BeschreibungsTyp::Offer))
    }

    async fn antwort_erstellen(&self) -> SessionResult<SitzungsBeschreibung> {
        match self.remote.lock().as_ref().map(|b| b.typ) {
            Some(BeschreibungsTyp::Offer) => Ok(self.beschreibung(BeschreibungsTyp::Answer)),
            _ => Err(SessionError::verhandlung("Antwort ohne Angebot")),
        }
    }

    async fn lokale_beschreibung_setzen(
        &self,
        beschreibung: SitzungsBeschreibung,
    ) -> SessionResult<()> {
        *self.lokal.lock() = Some(beschreibung);
        Ok(())
    }

    async fn remote_beschreibung_setzen(
        &self,
        beschreibung: SitzungsBeschreibung,
    ) -> SessionResult<()> {
        if !beschreibung.sdp.starts_with("v=0") {
            return Err(SessionError::verhandlung("SDP ungueltig"));
        }

        let lokaler_typ = self.lokal.lock().as_ref().map(|b| b.typ);
        match (lokaler_typ, beschreibung.typ) {
            (None, BeschreibungsTyp::Offer) => {
                if let Some(kanal) = self.leitung.ausstehender_kanal.lock().take() {
                    let _ = self.eingehend_tx.try_send(kanal);
                }
            }
            (Some(BeschreibungsTyp::Offer), BeschreibungsTyp::Answer) => {}
            (lokal, remote) => {
                return Err(SessionError::verhandlung(format!(
                    "Remote-Beschreibung {remote} passt nicht zu lokal {lokal:?}"
                )));
            }
        }
        *self.remote.lock() = Some(beschreibung);

        if self.leitung.remote_gesetzt.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
            self.leitung.offen_tx.send_replace(true);
        }
        Ok(())
    }

    async fn sammlung_abwarten(&self) -> SessionResult<()> {
        if self.sammlung_haengt.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.lokal.lock().is_none() {
            return Err(SessionError::verhandlung(
                "Sammlung ohne lokale Beschreibung abgewartet",
            ));
        }
        Ok(())
    }

    async fn lokale_beschreibung(&self) -> SessionResult<SitzungsBeschreibung> {
        self.lokal
            .lock()
            .clone()
            .ok_or_else(|| SessionError::verhandlung("Keine lokale Beschreibung vorhanden"))
    }

    async fn eingehenden_kanal_abwarten(&self) -> SessionResult<Arc<dyn DatenKanal>> {
        let kanal = self
            .eingehend_rx
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| SessionError::kanal("Kein eingehender Kanal"))?;
        Ok(kanal)
    }

    async fn schliessen(&self) -> SessionResult<()> {
        tracing::trace!(seite = self.name, "Speicher-Verhandlung geschlossen");
        Ok(())
    }
}

// ============================================================================
// SpeicherSignal
// ============================================================================

/// `SignalVerbindung` ohne Relay, gesteuert ueber eine Gegenstelle
pub struct SpeicherSignal {
    eingang: mpsc::UnboundedReceiver<SessionResult<String>>,
    ausgang: mpsc::UnboundedSender<String>,
}

/// Testseite einer `SpeicherSignal`-Verbindung
///
/// Droppen der Gegenstelle beendet die Verbindung.
pub struct SpeicherSignalGegenstelle {
    eingang: mpsc::UnboundedSender<SessionResult<String>>,
    ausgang: mpsc::UnboundedReceiver<String>,
}

impl SpeicherSignal {
    pub fn neu() -> (SpeicherSignal, SpeicherSignalGegenstelle) {
        let (eingang_tx, eingang_rx) = mpsc::unbounded_channel();
        let (ausgang_tx, ausgang_rx) = mpsc::unbounded_channel();
        (
            SpeicherSignal {
                eingang: eingang_rx,
                ausgang: ausgang_tx,
            },
            SpeicherSignalGegenstelle {
                eingang: eingang_tx,
                ausgang: ausgang_rx,
            },
        )
    }
}

impl SpeicherSignalGegenstelle {
    /// Stellt eine Nachricht zu, als kaeme sie vom Relay
    pub fn einspeisen(&self, text: impl Into<String>) {
        let _ = self.eingang.send(Ok(text.into()));
    }

    /// Stellt einen Lesefehler zu
    pub fn fehler_einspeisen(&self, fehler: SessionError) {
        let _ = self.eingang.send(Err(fehler));
    }

    /// Naechste vom Treiber gesendete Nachricht
    pub async fn gesendet(&mut self) -> Option<String> {
        self.ausgang.recv().await
    }
}

#[async_trait]
impl SignalVerbindung for SpeicherSignal {
    async fn senden(&mut self, text: String) -> SessionResult<()> {
        self.ausgang
            .send(text)
            .map_err(|_| SessionError::RelayGetrennt("Gegenstelle geschlossen".into()))
    }

    async fn empfangen(&mut self) -> Option<SessionResult<String>> {
        self.eingang.recv().await
    }
}
