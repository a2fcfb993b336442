//! Chat-Adapter – Zeilen verschluesselt ueber den offenen Data Channel
//!
//! Drei Tasks pro Sitzung:
//! - Eingabe: liest Zeilen, verschluesselt sie und legt sie in die Sende-Queue
//! - Senden: leert die Sende-Queue in den Kanal
//! - Ausgabe: entschluesselt eingehende Nachrichten und schreibt
//!   `Peer: <klartext>` zeilenweise
//!
//! Die Eingabe wartet nie auf den Kanal. Ist die Sende-Queue voll, wird die
//! Zeile verworfen. Fehler einzelner Nachrichten (Verschluesselung, Senden,
//! Entschluesselung) werden geloggt, die Sitzung laeuft weiter.

use fluesterpost_crypto::NachrichtenCodec;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::{SessionError, SessionResult};
use crate::verhandlung::DatenKanal;

/// Praefix jeder ausgegebenen Peer-Nachricht
pub const PEER_PRAEFIX: &str = "Peer: ";

/// Zeilen, die auf den Kanal warten duerfen
pub const SENDE_QUEUE_GROESSE: usize = 32;

/// Verbindet einen offenen Kanal mit Ein- und Ausgabe
pub struct ChatAdapter;

impl ChatAdapter {
    /// Startet Eingabe- und Ausgabe-Task
    ///
    /// Schlaegt fehl wenn der Nachrichtenstrom des Kanals bereits
    /// uebernommen wurde.
    pub fn starten<E, A>(
        kanal: Arc<dyn DatenKanal>,
        codec: NachrichtenCodec,
        eingabe: E,
        ausgabe: A,
    ) -> SessionResult<ChatSitzung>
    where
        E: AsyncBufRead + Unpin + Send + 'static,
        A: AsyncWrite + Unpin + Send + 'static,
    {
        let nachrichten = kanal
            .nachrichten()
            .ok_or_else(|| SessionError::kanal("Nachrichtenstrom bereits uebernommen"))?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let (sende_tx, sende_rx) = mpsc::channel(SENDE_QUEUE_GROESSE);

        tracing::info!(kanal = %kanal.label(), "Chat gestartet");

        let eingabe_task = tokio::spawn(eingabe_schleife(
            codec.clone(),
            eingabe,
            sende_tx,
            stop_rx.clone(),
        ));
        let sende_task = tokio::spawn(sende_schleife(kanal, sende_rx, stop_rx.clone()));
        let ausgabe_task = tokio::spawn(ausgabe_schleife(nachrichten, codec, ausgabe, stop_rx));

        Ok(ChatSitzung {
            stop_tx,
            eingabe: Some(eingabe_task),
            senden: Some(sende_task),
            ausgabe: Some(ausgabe_task),
        })
    }
}

/// Laufende Chat-Sitzung
pub struct ChatSitzung {
    stop_tx: watch::Sender<bool>,
    eingabe: Option<JoinHandle<()>>,
    senden: Option<JoinHandle<()>>,
    ausgabe: Option<JoinHandle<()>>,
}

impl ChatSitzung {
    /// Wartet bis der Kanal von der Gegenseite geschlossen wird
    pub async fn kanal_geschlossen(&mut self) {
        if let Some(ausgabe) = self.ausgabe.take() {
            if let Err(e) = ausgabe.await {
                tracing::warn!(fehler = %e, "Ausgabe-Task abgebrochen");
            }
        }
    }

    /// Stoppt alle Tasks und wartet auf ihr Ende
    pub async fn beenden(mut self) {
        self.stop_tx.send_replace(true);
        let tasks = [self.eingabe.take(), self.senden.take(), self.ausgabe.take()];
        for task in tasks.into_iter().flatten() {
            if let Err(e) = task.await {
                tracing::warn!(fehler = %e, "Chat-Task abgebrochen");
            }
        }
        tracing::info!("Chat beendet");
    }
}

async fn eingabe_schleife<E>(
    codec: NachrichtenCodec,
    eingabe: E,
    sende_tx: mpsc::Sender<String>,
    mut stop_rx: watch::Receiver<bool>,
) where
    E: AsyncBufRead + Unpin + Send,
{
    let mut zeilen = eingabe.lines();

    loop {
        let zeile = tokio::select! {
            zeile = zeilen.next_line() => zeile,
            _ = stop_rx.wait_for(|stop| *stop) => break,
        };

        let zeile = match zeile {
            Ok(Some(zeile)) => zeile,
            Ok(None) => {
                tracing::info!("Eingabe beendet");
                break;
            }
            Err(e) => {
                tracing::warn!(fehler = %e, "Eingabe-Lesefehler");
                break;
            }
        };

        let wire = match codec.verschluesseln(&zeile) {
            Ok(wire) => wire,
            Err(e) => {
                tracing::error!(fehler = %e, "Verschluesselung fehlgeschlagen – Zeile verworfen");
                continue;
            }
        };

        match sende_tx.try_send(wire) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    queue = SENDE_QUEUE_GROESSE,
                    "Kanal kommt nicht nach – Zeile verworfen"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => break,
        }
    }
}

async fn sende_schleife(
    kanal: Arc<dyn DatenKanal>,
    mut sende_rx: mpsc::Receiver<String>,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        let wire = tokio::select! {
            wire = sende_rx.recv() => wire,
            _ = stop_rx.wait_for(|stop| *stop) => break,
        };
        let Some(wire) = wire else {
            break;
        };

        tokio::select! {
            ergebnis = kanal.text_senden(&wire) => {
                if let Err(e) = ergebnis {
                    tracing::warn!(fehler = %e, "Senden fehlgeschlagen – Zeile verworfen");
                }
            }
            _ = stop_rx.wait_for(|stop| *stop) => break,
        }
    }
}

async fn ausgabe_schleife<A>(
    mut nachrichten: mpsc::Receiver<Vec<u8>>,
    codec: NachrichtenCodec,
    mut ausgabe: A,
    mut stop_rx: watch::Receiver<bool>,
) where
    A: AsyncWrite + Unpin + Send,
{
    loop {
        let daten = tokio::select! {
            daten = nachrichten.recv() => daten,
            _ = stop_rx.wait_for(|stop| *stop) => break,
        };

        let Some(daten) = daten else {
            tracing::info!("Data Channel geschlossen");
            break;
        };

        let klartext = match codec.entschluesseln_bytes(&daten) {
            Ok(klartext) => klartext,
            Err(e) if e.ist_nachrichtenfehler() => {
                tracing::warn!(fehler = %e, bytes = daten.len(), "Nachricht nicht entschluesselbar – verworfen");
                continue;
            }
            Err(e) => {
                tracing::error!(fehler = %e, "Entschluesselung fehlgeschlagen – Nachricht verworfen");
                continue;
            }
        };

        let zeile = format!("{PEER_PRAEFIX}{klartext}\n");
        if let Err(e) = ausgabe.write_all(zeile.as_bytes()).await {
            tracing::error!(fehler = %e, "Ausgabe fehlgeschlagen");
            break;
        }
        if let Err(e) = ausgabe.flush().await {
            tracing::error!(fehler = %e, "Ausgabe fehlgeschlagen");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speicher::SpeicherKanal;
    use async_trait::async_trait;
    use fluesterpost_crypto::SymmetrischerSchluessel;
    use parking_lot::Mutex;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

    /// Kanal, dessen erster Sendeversuch fehlschlaegt
    struct WackelKanal {
        fehlschlaege: Mutex<usize>,
        gesendet: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl DatenKanal for WackelKanal {
        fn label(&self) -> String {
            "chat".into()
        }

        async fn offen_abwarten(&self) -> SessionResult<()> {
            Ok(())
        }

        async fn text_senden(&self, text: &str) -> SessionResult<()> {
            {
                let mut fehlschlaege = self.fehlschlaege.lock();
                if *fehlschlaege > 0 {
                    *fehlschlaege -= 1;
                    return Err(SessionError::kanal("Puffer voll"));
                }
            }
            let _ = self.gesendet.send(text.to_string());
            Ok(())
        }

        fn nachrichten(&self) -> Option<mpsc::Receiver<Vec<u8>>> {
            let (_tx, rx) = mpsc::channel(1);
            Some(rx)
        }
    }

    fn codec() -> NachrichtenCodec {
        NachrichtenCodec::neu(SymmetrischerSchluessel::zufaellig(32).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn zeilen_gehen_verschluesselt_raus() {
        let codec = codec();
        let (lokal, fern) = SpeicherKanal::paar("chat");
        let mut fern_eingang = fern.nachrichten().unwrap();

        let eingabe = BufReader::new(&b"hallo\nzweite zeile\n"[..]);
        let sitzung =
            ChatAdapter::starten(Arc::new(lokal), codec.clone(), eingabe, tokio::io::sink())
                .unwrap();

        for erwartet in ["hallo", "zweite zeile"] {
            let daten = fern_eingang.recv().await.unwrap();
            let wire = String::from_utf8(daten).unwrap();
            assert_ne!(wire, erwartet, "Klartext darf nicht auf dem Kanal liegen");
            assert_eq!(codec.entschluesseln(&wire).unwrap(), erwartet);
        }
        sitzung.beenden().await;
    }

    #[tokio::test]
    async fn eingehende_nachrichten_mit_praefix() {
        let codec = codec();
        let (lokal, fern) = SpeicherKanal::paar("chat");
        let (ausgabe, mut leser) = tokio::io::duplex(1024);

        let mut sitzung = ChatAdapter::starten(
            Arc::new(lokal),
            codec.clone(),
            BufReader::new(tokio::io::empty()),
            ausgabe,
        )
        .unwrap();

        fern.text_senden(&codec.verschluesseln("Gruesse").unwrap())
            .await
            .unwrap();
        // Nicht entschluesselbar: verworfen
        fern.text_senden("kein base64 ###").await.unwrap();
        let fremd = NachrichtenCodec::neu(SymmetrischerSchluessel::zufaellig(32).unwrap()).unwrap();
        fern.text_senden(&fremd.verschluesseln("fremd").unwrap())
            .await
            .unwrap();
        fern.text_senden(&codec.verschluesseln("danach").unwrap())
            .await
            .unwrap();

        drop(fern);
        tokio::time::timeout(Duration::from_secs(2), sitzung.kanal_geschlossen())
            .await
            .unwrap();
        sitzung.beenden().await;

        let mut text = String::new();
        leser.read_to_string(&mut text).await.unwrap();
        assert_eq!(text, "Peer: Gruesse\nPeer: danach\n");
    }

    #[tokio::test]
    async fn nachrichtenstrom_nur_einmal() {
        let (lokal, _fern) = SpeicherKanal::paar("chat");
        let kanal: Arc<dyn DatenKanal> = Arc::new(lokal);
        let _ = kanal.nachrichten();

        let ergebnis = ChatAdapter::starten(
            kanal,
            codec(),
            BufReader::new(tokio::io::empty()),
            tokio::io::sink(),
        );
        assert!(matches!(ergebnis, Err(SessionError::Kanal(_))));
    }

    #[tokio::test]
    async fn beenden_stoppt_wartende_tasks() {
        let (lokal, _fern) = SpeicherKanal::paar("chat");
        // Eingabe ohne EOF
        let (_schreiber, eingabe) = tokio::io::duplex(64);

        let sitzung = ChatAdapter::starten(
            Arc::new(lokal),
            codec(),
            BufReader::new(eingabe),
            tokio::io::sink(),
        )
        .unwrap();

        tokio::time::timeout(Duration::from_secs(2), sitzung.beenden())
            .await
            .expect("Tasks muessen auf das Stopp-Signal reagieren");
    }

    #[tokio::test]
    async fn haengender_kanal_blockiert_weder_eingabe_noch_beenden() {
        let (lokal, fern) = SpeicherKanal::paar("chat");
        // Gegenseite liest nie: der Kanalpuffer laeuft voll
        let _ungelesen = fern.nachrichten().unwrap();
        let (mut tastatur, eingabe) = tokio::io::duplex(64);

        let sitzung = ChatAdapter::starten(
            Arc::new(lokal),
            codec(),
            BufReader::new(eingabe),
            tokio::io::sink(),
        )
        .unwrap();

        let mut zeilen = String::new();
        for i in 0..150 {
            zeilen.push_str(&format!("zeile {i}\n"));
        }
        // Der Duplex-Puffer ist klein: das gelingt nur, wenn die Eingabe weiterliest
        tokio::time::timeout(Duration::from_secs(2), tastatur.write_all(zeilen.as_bytes()))
            .await
            .expect("Eingabe muss trotz vollem Kanal weiterlesen")
            .unwrap();

        tokio::time::timeout(Duration::from_secs(2), sitzung.beenden())
            .await
            .expect("beenden darf nicht am Kanal haengen");
    }

    #[tokio::test]
    async fn sendefehler_verwirft_nur_die_zeile() {
        let codec = codec();
        let (gesendet_tx, mut gesendet_rx) = mpsc::unbounded_channel();
        let kanal = WackelKanal {
            fehlschlaege: Mutex::new(1),
            gesendet: gesendet_tx,
        };

        let eingabe = BufReader::new(&b"verloren\nangekommen\n"[..]);
        let sitzung =
            ChatAdapter::starten(Arc::new(kanal), codec.clone(), eingabe, tokio::io::sink())
                .unwrap();

        let wire = tokio::time::timeout(Duration::from_secs(2), gesendet_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(codec.entschluesseln(&wire).unwrap(), "angekommen");

        sitzung.beenden().await;
        assert!(gesendet_rx.try_recv().is_err());
    }
}
