//! Parser fuer die Befehlszeilen auf stdin
//!
//! ```text
//! start <id>
//! stop <id>
//! recent [offset] [anzahl]
//! status
//! endpoint <host> <port>
//! quit
//! ```

use charm_protocol::{Command, TaskId};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EingabeFehler {
    #[error("Unbekannter Befehl: '{0}' (start, stop, recent, status, endpoint, quit)")]
    Unbekannt(String),

    #[error("Fehlendes Argument: {0}")]
    FehlendesArgument(&'static str),

    #[error("Ungueltige Zahl fuer {feld}: '{wert}'")]
    UngueltigeZahl { feld: &'static str, wert: String },

    #[error("Zu viele Argumente fuer '{0}'")]
    ZuVieleArgumente(String),
}

/// Ergebnis einer geparsten Eingabezeile
#[derive(Debug, PartialEq, Eq)]
pub enum Eingabe {
    Befehl(Command),
    Beenden,
    Leer,
}

/// Parst eine Eingabezeile
///
/// `standard_anzahl` wird fuer `recent` ohne Anzahl verwendet.
pub fn parsen(zeile: &str, standard_anzahl: u32) -> Result<Eingabe, EingabeFehler> {
    let mut teile = zeile.split_whitespace();
    let Some(wort) = teile.next() else {
        return Ok(Eingabe::Leer);
    };

    let eingabe = match wort.to_ascii_lowercase().as_str() {
        "start" => Eingabe::Befehl(Command::Start {
            task_id: task_id(teile.next())?,
        }),
        "stop" => Eingabe::Befehl(Command::Stop {
            task_id: task_id(teile.next())?,
        }),
        "recent" => {
            let offset = teile.next().map(|w| zahl("offset", w)).transpose()?.unwrap_or(0);
            let count = teile
                .next()
                .map(|w| zahl("anzahl", w))
                .transpose()?
                .unwrap_or(standard_anzahl);
            Eingabe::Befehl(Command::ListRecent { offset, count })
        }
        "status" => Eingabe::Befehl(Command::QueryStatus),
        "endpoint" => {
            let host = teile.next().ok_or(EingabeFehler::FehlendesArgument("host"))?;
            let port = teile.next().ok_or(EingabeFehler::FehlendesArgument("port"))?;
            let port = port.parse::<u16>().map_err(|_| EingabeFehler::UngueltigeZahl {
                feld: "port",
                wert: port.to_string(),
            })?;
            Eingabe::Befehl(Command::SetEndpoint {
                host: host.to_string(),
                port,
            })
        }
        "quit" | "exit" => Eingabe::Beenden,
        _ => return Err(EingabeFehler::Unbekannt(wort.to_string())),
    };

    if teile.next().is_some() {
        return Err(EingabeFehler::ZuVieleArgumente(wort.to_string()));
    }
    Ok(eingabe)
}

fn task_id(wort: Option<&str>) -> Result<TaskId, EingabeFehler> {
    let wort = wort.ok_or(EingabeFehler::FehlendesArgument("task-id"))?;
    Ok(TaskId(zahl("task-id", wort)?))
}

fn zahl(feld: &'static str, wort: &str) -> Result<u32, EingabeFehler> {
    wort.parse().map_err(|_| EingabeFehler::UngueltigeZahl {
        feld,
        wert: wort.to_string(),
    })
}
