//! Ende-zu-Ende: zwei Treiber ueber ein echtes Relay, Verhandlung im Speicher
//!
//! Ein dritter Client im selben Raum schickt kaputte Nachrichten, die beide
//! Treiber ignorieren muessen.

use fluesterpost_core::Rolle;
use fluesterpost_crypto::{NachrichtenCodec, SymmetrischerSchluessel};
use fluesterpost_observability::RelayMetrics;
use fluesterpost_session::{
    ChatAdapter, DatenKanal, HandshakeTreiber, HandshakeZustand, SpeicherVerhandlung,
    WsSignalVerbindung,
};
use fluesterpost_signaling::{RelayHub, RelayServer, STANDARD_QUEUE_GROESSE};
use futures_util::SinkExt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::Message};

const TIMEOUT: Duration = Duration::from_secs(10);

async fn relay_starten() -> (SocketAddr, RelayHub, watch::Sender<bool>) {
    let hub = RelayHub::neu(STANDARD_QUEUE_GROESSE, RelayMetrics::neu().unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = RelayServer::neu(hub.clone(), addr);
    tokio::spawn(async move {
        server
            .mit_listener_starten(listener, shutdown_rx)
            .await
            .unwrap();
    });
    (addr, hub, shutdown_tx)
}

async fn warten_bis(mut bedingung: impl FnMut() -> bool) {
    for _ in 0..200 {
        if bedingung() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Bedingung nicht rechtzeitig erfuellt");
}

async fn handshake(
    rolle: Rolle,
    verhandlung: Arc<SpeicherVerhandlung>,
    mut signal: WsSignalVerbindung,
) -> (Arc<dyn DatenKanal>, WsSignalVerbindung) {
    let treiber = HandshakeTreiber::neu(verhandlung, TIMEOUT);
    let kanal = treiber.ausfuehren(rolle, &mut signal).await.unwrap();
    assert_eq!(treiber.aktueller_zustand(), HandshakeZustand::KanalOffen);
    (kanal, signal)
}

#[tokio::test]
async fn chat_ueber_relay_in_beide_richtungen() {
    let (addr, hub, shutdown_tx) = relay_starten().await;
    let url = format!("ws://{addr}/ws/szenario");

    let signal_initiator = WsSignalVerbindung::verbinden(&url).await.unwrap();
    let signal_responder = WsSignalVerbindung::verbinden(&url).await.unwrap();
    let (mut stoerer, _) = connect_async(url.as_str()).await.unwrap();
    let raum = fluesterpost_core::RaumId::neu("szenario").unwrap();
    warten_bis(|| hub.anzahl_in_raum(&raum) == 3).await;

    // Kaputte Nachrichten vor dem Angebot
    stoerer
        .send(Message::Text("{kein json".into()))
        .await
        .unwrap();
    stoerer
        .send(Message::Text(r#"{"type":"bogus","sdp":""}"#.into()))
        .await
        .unwrap();

    let (links, rechts) = SpeicherVerhandlung::paar();
    let responder = tokio::spawn(handshake(Rolle::Responder, rechts, signal_responder));
    let initiator = tokio::spawn(handshake(Rolle::Initiator, links, signal_initiator));

    let (kanal_angebot, _signal_a) = tokio::time::timeout(TIMEOUT, initiator)
        .await
        .unwrap()
        .unwrap();
    let (kanal_antwort, _signal_b) = tokio::time::timeout(TIMEOUT, responder)
        .await
        .unwrap()
        .unwrap();

    let schluessel = SymmetrischerSchluessel::aus_konfiguration("0123456789abcdef").unwrap();
    let codec = NachrichtenCodec::neu(schluessel).unwrap();

    let (mut tastatur_a, eingabe_a) = tokio::io::duplex(1024);
    let (ausgabe_a, bildschirm_a) = tokio::io::duplex(1024);
    let (mut tastatur_b, eingabe_b) = tokio::io::duplex(1024);
    let (ausgabe_b, bildschirm_b) = tokio::io::duplex(1024);

    let chat_a = ChatAdapter::starten(
        kanal_angebot,
        codec.clone(),
        BufReader::new(eingabe_a),
        ausgabe_a,
    )
    .unwrap();
    let chat_b = ChatAdapter::starten(
        kanal_antwort,
        codec,
        BufReader::new(eingabe_b),
        ausgabe_b,
    )
    .unwrap();

    let mut bildschirm_a = BufReader::new(bildschirm_a).lines();
    let mut bildschirm_b = BufReader::new(bildschirm_b).lines();

    tastatur_a.write_all(b"hallo von der Angebotsseite\n").await.unwrap();
    let zeile = tokio::time::timeout(TIMEOUT, bildschirm_b.next_line())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(zeile, "Peer: hallo von der Angebotsseite");

    tastatur_b.write_all(b"und zurueck\n").await.unwrap();
    let zeile = tokio::time::timeout(TIMEOUT, bildschirm_a.next_line())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(zeile, "Peer: und zurueck");

    chat_a.beenden().await;
    chat_b.beenden().await;
    shutdown_tx.send(true).unwrap();
}

#[tokio::test]
async fn relay_shutdown_waehrend_handshake_laesst_sitzung_fehlschlagen() {
    let (addr, hub, shutdown_tx) = relay_starten().await;
    let signal = WsSignalVerbindung::verbinden(&format!("ws://{addr}/ws"))
        .await
        .unwrap();
    warten_bis(|| hub.anzahl_verbindungen() == 1).await;

    let (_links, rechts) = SpeicherVerhandlung::paar();
    let responder = tokio::spawn(async move {
        let mut signal = signal;
        let treiber = HandshakeTreiber::neu(rechts, TIMEOUT);
        treiber.responder_ausfuehren(&mut signal).await.map(|_| ())
    });

    shutdown_tx.send(true).unwrap();
    let ergebnis = tokio::time::timeout(TIMEOUT, responder)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        ergebnis,
        Err(fluesterpost_session::SessionError::RelayGetrennt(_))
    ));
}
