//! Hauptschleife des CLI
//!
//! Verbindet Eingabezeilen, Client-Ereignisse, den Status-Takt und das
//! Abbruchsignal in einer `select!`-Schleife. Der Client selbst wird vom
//! Aufrufer gestartet und gestoppt.

use std::future::Future;
use std::io::{self, Write};

use charm_client::{CharmClient, ClientConfig, Command, EventReceiver};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::MissedTickBehavior;

use crate::auffrischung::Auffrischung;
use crate::ausgabe;
use crate::eingabe::{self, Eingabe};

#[derive(Debug, Clone)]
pub struct Optionen {
    /// Ereignisse als JSON-Zeilen ausgeben
    pub json: bool,
    pub recent_anzahl: u32,
    pub status_intervall_s: u64,
}

impl Optionen {
    pub fn aus_config(config: &ClientConfig, json: bool) -> Self {
        Self {
            json,
            recent_anzahl: config.worker.recent_anzahl,
            status_intervall_s: config.worker.status_intervall_s,
        }
    }
}

/// Grund fuer das Ende der Schleife
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ende {
    /// Eingabe erschoepft (EOF)
    EingabeEnde,
    /// `quit` / `exit`
    Beenden,
    /// Abbruchsignal (Ctrl-C)
    Abbruch,
    /// Ereigniskanal geschlossen
    KeineEreignisse,
}

/// Laeuft bis EOF, `quit`, Abbruch oder Ende des Ereigniskanals
///
/// `abbruch` wird genau einmal angelegt und ueber alle Iterationen gepollt.
pub async fn ausfuehren<R, A, W>(
    client: &CharmClient,
    events: &mut EventReceiver,
    quelle: R,
    abbruch: A,
    optionen: &Optionen,
    ziel: &mut W,
) -> io::Result<Ende>
where
    R: AsyncBufRead + Unpin,
    A: Future,
    W: Write,
{
    let mut auffrischung = Auffrischung::neu(optionen.recent_anzahl, optionen.status_intervall_s);
    let mut takt = tokio::time::interval(auffrischung.takt());
    takt.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut zeilen = quelle.lines();
    tokio::pin!(abbruch);

    loop {
        tokio::select! {
            _ = &mut abbruch => {
                tracing::info!("Abbruchsignal empfangen");
                return Ok(Ende::Abbruch);
            }
            zeile = zeilen.next_line() => {
                let Some(zeile) = zeile? else {
                    return Ok(Ende::EingabeEnde);
                };
                match eingabe::parsen(&zeile, optionen.recent_anzahl) {
                    Ok(Eingabe::Befehl(befehl)) => absenden(client, befehl),
                    Ok(Eingabe::Beenden) => return Ok(Ende::Beenden),
                    Ok(Eingabe::Leer) => {}
                    Err(e) => eprintln!("{e}"),
                }
            }
            event = events.recv() => {
                let Some(event) = event else {
                    return Ok(Ende::KeineEreignisse);
                };
                writeln!(ziel, "{}", ausgabe::formatieren(&event, optionen.json))?;
                for befehl in auffrischung.nach_event(&event) {
                    absenden(client, befehl);
                }
            }
            _ = takt.tick(), if auffrischung.status_aktiv() => {
                absenden(client, Command::QueryStatus);
            }
        }
    }
}

fn absenden(client: &CharmClient, befehl: Command) {
    if let Err(e) = client.submit(befehl) {
        tracing::warn!(fehler = %e, "Befehl nicht angenommen");
        eprintln!("{e}");
    }
}
