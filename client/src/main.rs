//! Fluesterpost Client – Einstiegspunkt
//!
//! Liest Rolle und Optionen von der Kommandozeile, laedt Konfiguration und
//! Schluessel und startet eine Chat-Sitzung. Logs gehen nach stderr, die
//! Chat-Ausgabe nach stdout.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use fluesterpost_client::{
    config::ClientConfig,
    schluessel::{schluessel_erzeugen, schluessel_laden, SCHLUESSEL_ENV},
    ChatClient,
};
use fluesterpost_core::Rolle;
use fluesterpost_crypto::NachrichtenCodec;
use fluesterpost_observability::{logging_initialisieren, LogZiel};
use tokio::sync::watch;

/// Rolle auf der Kommandozeile
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RollenArg {
    /// Erstellt den Kanal und sendet das Angebot
    Offer,
    /// Wartet auf Angebot und Kanal
    Answer,
}

impl From<RollenArg> for Rolle {
    fn from(arg: RollenArg) -> Self {
        match arg {
            RollenArg::Offer => Rolle::Initiator,
            RollenArg::Answer => Rolle::Responder,
        }
    }
}

#[derive(Parser)]
#[command(name = "fluesterpost-client")]
#[command(version)]
#[command(about = "Verschluesselter Peer-to-Peer-Chat ueber WebRTC")]
struct Cli {
    /// Rolle dieses Peers
    #[arg(long, value_enum, default_value = "offer")]
    role: RollenArg,

    /// WebSocket-URL des Relays (ueberschreibt die Konfiguration)
    #[arg(long)]
    relay: Option<String>,

    /// Raum am Relay (ueberschreibt die Konfiguration)
    #[arg(long)]
    room: Option<String>,

    /// Pfad zur Konfigurationsdatei
    #[arg(long, default_value = "client.toml")]
    config: String,

    /// Erzeugt einen neuen Schluessel und beendet sich
    #[arg(long)]
    generate_key: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.generate_key {
        println!("{}", schluessel_erzeugen()?);
        return Ok(());
    }

    let mut config = ClientConfig::laden(&cli.config)?;
    if let Some(relay) = cli.relay {
        config.relay.url = relay;
    }
    if let Some(raum) = cli.room {
        config.relay.raum = Some(raum);
    }

    logging_initialisieren(&config.logging.level, &config.logging.format, LogZiel::Stderr);

    // Ohne gueltigen Schluessel wird nicht gewaehlt
    let umgebung = std::env::var(SCHLUESSEL_ENV).ok();
    let schluessel = schluessel_laden(umgebung.as_deref(), config.sicherheit.schluessel.as_deref())?;
    let codec = NachrichtenCodec::neu(schluessel)?;

    let rolle = Rolle::from(cli.role);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        rolle = %rolle,
        config = %cli.config,
        "Fluesterpost Client wird initialisiert"
    );

    // Ctrl-C -> Shutdown-Signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown-Signal empfangen");
            let _ = shutdown_tx.send(true);
        }
    });

    ChatClient::neu(config, codec).ausfuehren(rolle, shutdown_rx).await?;

    // stdin-Lesen blockiert einen Thread bis zur naechsten Zeile
    std::process::exit(0);
}
