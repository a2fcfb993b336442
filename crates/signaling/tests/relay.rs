//! Integrationstests fuer das Signaling-Relay ueber echte WebSockets

use fluesterpost_observability::RelayMetrics;
use fluesterpost_signaling::{RelayHub, RelayServer, STANDARD_QUEUE_GROESSE};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestRelay {
    addr: SocketAddr,
    hub: RelayHub,
    shutdown_tx: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

async fn relay_starten() -> TestRelay {
    let hub = RelayHub::neu(STANDARD_QUEUE_GROESSE, RelayMetrics::neu().unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = RelayServer::neu(hub.clone(), addr);
    let task = tokio::spawn(async move {
        server
            .mit_listener_starten(listener, shutdown_rx)
            .await
            .unwrap();
    });

    TestRelay {
        addr,
        hub,
        shutdown_tx,
        task,
    }
}

async fn verbinden(addr: SocketAddr, pfad: &str) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}{pfad}")).await.unwrap();
    ws
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

async fn naechster_text(ws: &mut Client) -> String {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("Timeout beim Empfangen")
            .expect("Verbindung beendet")
            .unwrap();
        match frame {
            Message::Text(text) => return text.to_string(),
            Message::Ping(_) | Message::Pong(_) => continue,
            anderes => panic!("Unerwarteter Frame: {anderes:?}"),
        }
    }
}

async fn nichts_empfangen(ws: &mut Client) {
    let ergebnis = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
    assert!(ergebnis.is_err(), "Unerwartete Nachricht: {ergebnis:?}");
}

#[tokio::test]
async fn nachricht_an_alle_anderen_peers() {
    let relay = relay_starten().await;
    let mut a = verbinden(relay.addr, "/ws").await;
    let mut b = verbinden(relay.addr, "/ws").await;
    let mut c = verbinden(relay.addr, "/ws").await;
    warten_bis(|| relay.hub.anzahl_verbindungen() == 3).await;

    let angebot = r#"{"type":"offer","sdp":"v=0\r\n"}"#;
    a.send(Message::Text(angebot.into())).await.unwrap();

    assert_eq!(naechster_text(&mut b).await, angebot);
    assert_eq!(naechster_text(&mut c).await, angebot);
    nichts_empfangen(&mut a).await;
}

#[tokio::test]
async fn ungueltiges_json_wird_unveraendert_weitergeleitet() {
    let relay = relay_starten().await;
    let mut a = verbinden(relay.addr, "/ws").await;
    let mut b = verbinden(relay.addr, "/ws").await;
    warten_bis(|| relay.hub.anzahl_verbindungen() == 2).await;

    a.send(Message::Text("{kein json".into())).await.unwrap();
    assert_eq!(naechster_text(&mut b).await, "{kein json");
}

#[tokio::test]
async fn reihenfolge_einer_quelle_bleibt_erhalten() {
    let relay = relay_starten().await;
    let mut a = verbinden(relay.addr, "/ws").await;
    let mut b = verbinden(relay.addr, "/ws").await;
    warten_bis(|| relay.hub.anzahl_verbindungen() == 2).await;

    for i in 0..10 {
        a.send(Message::Text(format!("m{i}").into())).await.unwrap();
    }
    for i in 0..10 {
        assert_eq!(naechster_text(&mut b).await, format!("m{i}"));
    }
}

#[tokio::test]
async fn raeume_sind_getrennt() {
    let relay = relay_starten().await;
    let mut a = verbinden(relay.addr, "/ws/raum-x").await;
    let mut b = verbinden(relay.addr, "/ws/raum-x").await;
    let mut c = verbinden(relay.addr, "/ws").await;
    warten_bis(|| relay.hub.anzahl_verbindungen() == 3).await;

    a.send(Message::Text("nur raum-x".into())).await.unwrap();
    assert_eq!(naechster_text(&mut b).await, "nur raum-x");
    nichts_empfangen(&mut c).await;
}

#[tokio::test]
async fn ungueltiger_raum_wird_abgelehnt() {
    let relay = relay_starten().await;
    let ergebnis = connect_async(format!("ws://{}/ws/a.b", relay.addr)).await;
    match ergebnis {
        Err(tokio_tungstenite::tungstenite::Error::Http(antwort)) => {
            assert_eq!(antwort.status().as_u16(), 400);
        }
        anderes => panic!("Erwartet HTTP 400, erhalten: {anderes:?}"),
    }
    assert_eq!(relay.hub.anzahl_verbindungen(), 0);
}

#[tokio::test]
async fn getrennter_peer_wird_entfernt_rest_empfaengt_weiter() {
    let relay = relay_starten().await;
    let mut a = verbinden(relay.addr, "/ws").await;
    let b = verbinden(relay.addr, "/ws").await;
    let mut c = verbinden(relay.addr, "/ws").await;
    warten_bis(|| relay.hub.anzahl_verbindungen() == 3).await;

    drop(b);
    warten_bis(|| relay.hub.anzahl_verbindungen() == 2).await;

    a.send(Message::Text("noch da?".into())).await.unwrap();
    assert_eq!(naechster_text(&mut c).await, "noch da?");
}

#[tokio::test]
async fn shutdown_trennt_alle_verbindungen() {
    let relay = relay_starten().await;
    let mut a = verbinden(relay.addr, "/ws").await;
    warten_bis(|| relay.hub.anzahl_verbindungen() == 1).await;

    relay.shutdown_tx.send(true).unwrap();

    // Client sieht Close-Frame oder Verbindungsende
    let ende = tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            match a.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(ende.is_ok(), "Verbindung wurde nicht beendet");

    tokio::time::timeout(Duration::from_secs(3), relay.task)
        .await
        .expect("Relay hat nicht gestoppt")
        .unwrap();
    assert_eq!(relay.hub.anzahl_verbindungen(), 0);
}
