//! Relay-Hub – Blindes Weiterleiten von Signaling-Nachrichten
//!
//! Der Hub verwaltet die Send-Queues aller registrierten Signaling-
//! Verbindungen, gruppiert nach Raum. Jede eingehende Nachricht geht
//! unveraendert an alle *anderen* Verbindungen im selben Raum.
//!
//! ## Registry
//! Eine einzige `Mutex<HashMap<RaumId, HashMap<VerbindungsId, PeerSender>>>`
//! serialisiert Registrierung, Entfernung und Broadcast. Der Lock wird nur
//! fuer nicht-blockierende `try_send`-Aufrufe gehalten, nie ueber ein `.await`.
//!
//! ## Reihenfolge
//! Pro Quell-Verbindung ruft genau ein Lese-Task `weiterleiten` auf, pro
//! Ziel leert genau ein Schreib-Task eine FIFO-Queue. Die Reihenfolge pro
//! Quelle bleibt damit erhalten; zwischen Quellen gibt es keine Garantie.

use fluesterpost_core::{RaumId, VerbindungsId};
use fluesterpost_observability::RelayMetrics;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::SignalingError;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Standard-Groesse der Send-Queue pro Verbindung
pub const STANDARD_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// RelayPayload
// ---------------------------------------------------------------------------

/// Opaker Inhalt einer Signaling-Nachricht
///
/// Der Hub interpretiert den Inhalt nicht. Text-Frames bleiben Text,
/// Binaer-Frames bleiben binaer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayPayload {
    Text(String),
    Binaer(Vec<u8>),
}

impl RelayPayload {
    pub fn laenge(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binaer(daten) => daten.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// PeerSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer registrierten Verbindung
#[derive(Clone, Debug)]
pub struct PeerSender {
    pub id: VerbindungsId,
    tx: mpsc::Sender<RelayPayload>,
}

impl PeerSender {
    /// Reiht eine Nachricht nicht-blockierend ein
    ///
    /// Eine volle oder geschlossene Queue gilt als Zustellfehler.
    pub fn zustellen(&self, payload: RelayPayload) -> Result<(), SignalingError> {
        match self.tx.try_send(payload) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(SignalingError::Fanout {
                id: self.id,
                grund: "Send-Queue voll".into(),
            }),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SignalingError::Fanout {
                id: self.id,
                grund: "Verbindung geschlossen".into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// FanoutBericht
// ---------------------------------------------------------------------------

/// Ergebnis eines Broadcasts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutBericht {
    /// Anzahl erfolgreich eingereihter Zustellungen
    pub zugestellt: usize,
    /// Verbindungen, die wegen eines Zustellfehlers entfernt wurden
    pub entfernt: Vec<VerbindungsId>,
}

// ---------------------------------------------------------------------------
// RelayHub
// ---------------------------------------------------------------------------

type Registry = HashMap<RaumId, HashMap<VerbindungsId, PeerSender>>;

/// Zentrale Registry aller Signaling-Verbindungen eines Relays
///
/// Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct RelayHub {
    inner: Arc<RelayHubInner>,
}

struct RelayHubInner {
    raeume: Mutex<Registry>,
    queue_groesse: usize,
    metriken: RelayMetrics,
}

impl RelayHub {
    /// Erstellt einen neuen, leeren Hub
    pub fn neu(queue_groesse: usize, metriken: RelayMetrics) -> Self {
        Self {
            inner: Arc::new(RelayHubInner {
                raeume: Mutex::new(HashMap::new()),
                queue_groesse: queue_groesse.max(1),
                metriken,
            }),
        }
    }

    /// Registriert eine neue Verbindung und gibt ihre Empfangs-Queue zurueck
    ///
    /// Es gibt kein Limit fuer die Anzahl Verbindungen pro Raum.
    pub fn verbinden(&self, raum: &RaumId) -> (VerbindungsId, mpsc::Receiver<RelayPayload>) {
        let id = VerbindungsId::new();
        let (tx, rx) = mpsc::channel(self.inner.queue_groesse);

        let mut raeume = self.inner.raeume.lock();
        raeume
            .entry(raum.clone())
            .or_default()
            .insert(id, PeerSender { id, tx });
        self.gauges_aktualisieren(&raeume);
        drop(raeume);

        tracing::debug!(verbindung = %id, raum = %raum, "Verbindung im Hub registriert");
        (id, rx)
    }

    /// Leitet eine Nachricht an alle anderen Verbindungen im Raum weiter
    ///
    /// Ein Zustellfehler entfernt nur den betroffenen Peer; die restlichen
    /// Peers erhalten die Nachricht trotzdem. Nachrichten einer Verbindung,
    /// die nicht (mehr) im Raum registriert ist, werden verworfen.
    pub fn weiterleiten(
        &self,
        raum: &RaumId,
        von: VerbindungsId,
        payload: RelayPayload,
    ) -> FanoutBericht {
        let metriken = &self.inner.metriken;
        let mut bericht = FanoutBericht::default();
        let mut raeume = self.inner.raeume.lock();

        let Some(peers) = raeume.get_mut(raum) else {
            return bericht;
        };
        if !peers.contains_key(&von) {
            tracing::debug!(von = %von, raum = %raum, "Nachricht einer entfernten Verbindung verworfen");
            return bericht;
        }
        metriken.nachrichten_total.inc();

        for (id, sender) in peers.iter() {
            if *id == von {
                continue;
            }
            match sender.zustellen(payload.clone()) {
                Ok(()) => bericht.zugestellt += 1,
                Err(fehler) => {
                    tracing::warn!(
                        verbindung = %id,
                        raum = %raum,
                        fehler = %fehler,
                        "Weiterleitung fehlgeschlagen – Peer wird entfernt"
                    );
                    bericht.entfernt.push(*id);
                }
            }
        }

        // Entfernen erst nach der Iteration, noch unter demselben Lock
        for id in &bericht.entfernt {
            peers.remove(id);
        }
        if peers.is_empty() {
            raeume.remove(raum);
        }

        metriken.zustellungen_total.inc_by(bericht.zugestellt as u64);
        metriken.fanout_fehler_total.inc_by(bericht.entfernt.len() as u64);
        self.gauges_aktualisieren(&raeume);
        drop(raeume);

        tracing::trace!(
            von = %von,
            raum = %raum,
            bytes = payload.laenge(),
            zugestellt = bericht.zugestellt,
            "Nachricht weitergeleitet"
        );
        bericht
    }

    /// Entfernt eine Verbindung aus dem Hub
    ///
    /// Gibt `true` zurueck wenn die Verbindung registriert war.
    pub fn trennen(&self, raum: &RaumId, id: &VerbindungsId) -> bool {
        let mut raeume = self.inner.raeume.lock();
        let entfernt = match raeume.get_mut(raum) {
            Some(peers) => {
                let entfernt = peers.remove(id).is_some();
                if peers.is_empty() {
                    raeume.remove(raum);
                }
                entfernt
            }
            None => false,
        };
        self.gauges_aktualisieren(&raeume);
        drop(raeume);

        if entfernt {
            tracing::debug!(verbindung = %id, raum = %raum, "Verbindung aus Hub entfernt");
        }
        entfernt
    }

    /// Entfernt alle Verbindungen (Relay-Shutdown)
    ///
    /// Die Send-Queues werden dabei geschlossen, die Schreib-Tasks beenden
    /// sich und schicken ein Close-Frame.
    pub fn alle_trennen(&self) -> usize {
        let mut raeume = self.inner.raeume.lock();
        let anzahl = raeume.values().map(HashMap::len).sum();
        raeume.clear();
        self.gauges_aktualisieren(&raeume);
        anzahl
    }

    /// Gibt die Anzahl aller registrierten Verbindungen zurueck
    pub fn anzahl_verbindungen(&self) -> usize {
        self.inner.raeume.lock().values().map(HashMap::len).sum()
    }

    /// Gibt die Anzahl der Verbindungen in einem Raum zurueck
    pub fn anzahl_in_raum(&self, raum: &RaumId) -> usize {
        self.inner
            .raeume
            .lock()
            .get(raum)
            .map(HashMap::len)
            .unwrap_or(0)
    }

    /// Prueft ob eine Verbindung registriert ist
    pub fn ist_registriert(&self, raum: &RaumId, id: &VerbindungsId) -> bool {
        self.inner
            .raeume
            .lock()
            .get(raum)
            .is_some_and(|peers| peers.contains_key(id))
    }

    pub fn metriken(&self) -> &RelayMetrics {
        &self.inner.metriken
    }

    fn gauges_aktualisieren(&self, raeume: &Registry) {
        let verbindungen: usize = raeume.values().map(HashMap::len).sum();
        self.inner.metriken.verbindungen.set(verbindungen as i64);
        self.inner.metriken.raeume.set(raeume.len() as i64);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
