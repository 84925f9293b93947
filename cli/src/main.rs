//! Charm CLI – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den Client.
//! Mit `--json` wird jedes Ereignis als JSON-Zeile ausgegeben.

use anyhow::Result;
use charm_cli::ausgabe;
use charm_cli::sitzung::{self, Optionen};
use charm_client::{CharmClient, ClientConfig};
use charm_observability::logging_initialisieren;
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var("CHARM_CONFIG").unwrap_or_else(|_| "charm.toml".into());

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let config = ClientConfig::laden(&config_pfad)?;

    logging_initialisieren(&config.logging.level, &config.logging.format)?;

    let json = std::env::args().skip(1).any(|a| a == "--json");
    let optionen = Optionen::aus_config(&config, json);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        endpunkt = %config.verbindung.endpunkt(),
        "Charm-Client wird gestartet"
    );

    let (mut client, mut events) = CharmClient::neu(config);
    client.starten()?;

    let mut stdout = std::io::stdout();
    let ende = sitzung::ausfuehren(
        &client,
        &mut events,
        BufReader::new(tokio::io::stdin()),
        tokio::signal::ctrl_c(),
        &optionen,
        &mut stdout,
    )
    .await;

    client.stoppen().await;
    while let Ok(event) = events.try_recv() {
        println!("{}", ausgabe::formatieren(&event, json));
    }

    let ende = ende?;
    tracing::info!(?ende, "Charm-Client beendet");
    Ok(())
}
