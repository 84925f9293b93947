//! Wire-Format der Charm-Verbindung
//!
//! Zeilenbasiertes ASCII-Protokoll, jede Zeile endet mit `\n`.
//! Es gibt kein Framing ausser Zeilenumbruechen und keine Pufferung
//! angebrochener Zeilen ueber mehrere Reads hinweg: eine zerteilte Zeile
//! ist ein defekter Datensatz und wird verworfen, nicht als Fehler gemeldet.
//!
//! ## Client -> Server
//! ```text
//! READY                    Antwort auf HELLO
//! START <id>               Task starten
//! STOP <id>                Task stoppen
//! RECENT <offset> <count>  Recent-Liste abfragen
//! STATUS                   Laufzeiten abfragen
//! BYE                      Verbindungsabbau
//! ```
//!
//! ## Server -> Client
//! ```text
//! HELLO                          Handshake-Einladung
//! ACK...                         Handshake-Bestaetigung
//! NAK                            Abgelehnt / keine Daten
//! TASK ACTIVATED <id4> <name>    Push: Task aktiviert
//! TASK DEACTIVATED <id4> <name>  Push: Task deaktiviert
//! <id4> <name>                   Zeile einer RECENT-Antwort
//! <id4> <sekunden>               Zeile einer STATUS-Antwort
//! ```

use crate::control::{AntwortArt, Command, Event};
use crate::types::TaskId;

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Antwort des Clients auf `HELLO`
pub const READY_ZEILE: &str = "READY\n";

/// Abschiedszeile beim Verbindungsabbau
pub const BYE_ZEILE: &str = "BYE\n";

const HELLO: &str = "HELLO";
const ACK: &str = "ACK";
const NAK: &str = "NAK";
const TASK_PRAEFIX: &str = "TASK ";
const ACTIVATED: &str = "ACTIVATED";
const DEACTIVATED: &str = "DEACTIVATED";

// ---------------------------------------------------------------------------
// Kodierung
// ---------------------------------------------------------------------------

/// Kodiert einen Befehl als Wire-Zeile
///
/// `SetEndpoint` ist ein rein lokaler Befehl und hat keine Wire-Form.
pub fn encode_command(command: &Command) -> Option<String> {
    match command {
        Command::SetEndpoint { .. } => None,
        Command::Start { task_id } => Some(format!("START {}\n", task_id.inner())),
        Command::Stop { task_id } => Some(format!("STOP {}\n", task_id.inner())),
        Command::ListRecent { offset, count } => Some(format!("RECENT {offset} {count}\n")),
        Command::QueryStatus => Some("STATUS\n".to_string()),
    }
}

// ---------------------------------------------------------------------------
// Zeilen
// ---------------------------------------------------------------------------

/// Zerlegt empfangenen Text in logische Zeilen
///
/// Ein abschliessendes `\r` wird entfernt, leere Zeilen werden uebersprungen.
pub fn zeilen(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n')
        .map(|zeile| zeile.strip_suffix('\r').unwrap_or(zeile))
        .filter(|zeile| !zeile.is_empty())
}

/// Einordnung einer Zeile waehrend des Handshakes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeZeile {
    /// Server laedt zur Sitzung ein
    Hello,
    /// Server bestaetigt `READY`
    Ack,
    /// Alles andere
    Unerwartet,
}

/// Ordnet eine Zeile fuer den Handshake ein (Praefix-Vergleich)
pub fn handshake_klassifizieren(zeile: &str) -> HandshakeZeile {
    if zeile.starts_with(HELLO) {
        HandshakeZeile::Hello
    } else if zeile.starts_with(ACK) {
        HandshakeZeile::Ack
    } else {
        HandshakeZeile::Unerwartet
    }
}

/// Gibt true zurueck wenn die Zeile eine Ablehnung (`NAK`) ist
pub fn ist_nak(zeile: &str) -> bool {
    zeile.starts_with(NAK)
}

// ---------------------------------------------------------------------------
// Dekodierung
// ---------------------------------------------------------------------------

/// Dekodiert eine einzelne Push-Zeile (`TASK ACTIVATED|DEACTIVATED ...`)
///
/// Gibt `None` zurueck fuer unbekannte oder defekte Zeilen. Defekte
/// Task-Zeilen werden mit einer Diagnose verworfen.
pub fn decode_push(zeile: &str) -> Option<Event> {
    let rest = zeile.strip_prefix(TASK_PRAEFIX)?;
    let (art, datensatz) = rest.split_once(' ').unwrap_or((rest, ""));

    let aktiviert = match art {
        ACTIVATED => true,
        DEACTIVATED => false,
        _ => {
            tracing::debug!(zeile, "Unbekannte Task-Meldung verworfen");
            return None;
        }
    };

    let Some((task_id, name)) = id_und_rest(datensatz) else {
        tracing::debug!(zeile, "Task-Meldung nicht parsebar");
        return None;
    };

    let name = name.to_string();
    Some(if aktiviert {
        Event::TaskActivated { task_id, name }
    } else {
        Event::TaskDeactivated { task_id, name }
    })
}

/// Gibt true zurueck wenn die Zeile eine Push-Meldung ist
pub fn ist_push(zeile: &str) -> bool {
    zeile.starts_with(TASK_PRAEFIX)
}

/// Dekodiert alle Push-Meldungen aus einem empfangenen Block
///
/// Zeilen ohne bekanntes Praefix erzeugen kein Ereignis.
pub fn decode_pushes(text: &str) -> Vec<Event> {
    zeilen(text)
        .filter_map(|zeile| {
            if !ist_push(zeile) {
                tracing::trace!(zeile, "Zeile ohne bekanntes Praefix ignoriert");
                return None;
            }
            decode_push(zeile)
        })
        .collect()
}

/// Dekodiert die Antwort auf `RECENT` oder `STATUS`
///
/// - Eine `NAK`-Zeile bedeutet "keine Daten" und erzeugt kein Ereignis.
/// - Eingestreute Push-Meldungen werden wie in [`decode_pushes`] dekodiert.
/// - Jede andere Zeile ist ein Datensatz; bei `Recent` ist der Index die
///   Position des Datensatzes in der Antwort (defekte Zeilen zaehlen mit).
pub fn decode_response(art: AntwortArt, text: &str) -> Vec<Event> {
    let mut events = Vec::new();
    let mut position = 0usize;

    for zeile in zeilen(text) {
        if ist_push(zeile) {
            events.extend(decode_push(zeile));
            continue;
        }
        if ist_nak(zeile) {
            tracing::debug!(?art, "Server meldet NAK");
            continue;
        }

        let index = position;
        position += 1;

        let event = match art {
            AntwortArt::Recent => decode_recent_zeile(zeile, index),
            AntwortArt::Status => decode_status_zeile(zeile),
        };
        match event {
            Some(event) => events.push(event),
            None => tracing::debug!(zeile, ?art, "Antwortzeile nicht parsebar"),
        }
    }

    events
}

/// `<id4> <name>`
fn decode_recent_zeile(zeile: &str, index: usize) -> Option<Event> {
    let (task_id, name) = id_und_rest(zeile)?;
    Some(Event::RecentTask {
        task_id,
        name: name.to_string(),
        index,
    })
}

/// `<id4> <sekunden>`
fn decode_status_zeile(zeile: &str) -> Option<Event> {
    let (task_id, sekunden) = id_und_rest(zeile)?;
    let seconds = sekunden.trim().parse::<u64>().ok()?;
    Some(Event::TaskStatus { task_id, seconds })
}

/// Trennt ein vierstelliges ID-Feld vom Rest der Zeile
///
/// Zwischen ID und Rest steht genau ein Leerzeichen.
fn id_und_rest(datensatz: &str) -> Option<(TaskId, &str)> {
    let (feld, rest) = datensatz.split_once(' ')?;
    Some((TaskId::aus_feld(feld)?, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aktiviert(id: u32, name: &str) -> Event {
        Event::TaskActivated {
            task_id: TaskId(id),
            name: name.into(),
        }
    }

    #[test]
    fn befehle_kodieren() {
        let start = Command::Start { task_id: TaskId(42) };
        assert_eq!(encode_command(&start).as_deref(), Some("START 42\n"));

        let stop = Command::Stop { task_id: TaskId(7) };
        assert_eq!(encode_command(&stop).as_deref(), Some("STOP 7\n"));

        let recent = Command::ListRecent { offset: 0, count: 2 };
        assert_eq!(encode_command(&recent).as_deref(), Some("RECENT 0 2\n"));

        assert_eq!(encode_command(&Command::QueryStatus).as_deref(), Some("STATUS\n"));
    }

    #[test]
    fn set_endpoint_hat_keine_wire_form() {
        let cmd = Command::SetEndpoint {
            host: "charm.local".into(),
            port: 5323,
        };
        assert_eq!(encode_command(&cmd), None);
    }

    #[test]
    fn zeilen_zerlegen() {
        let teile: Vec<&str> = zeilen("HELLO\r\n\nACK ok\n").collect();
        assert_eq!(teile, vec!["HELLO", "ACK ok"]);
        assert_eq!(zeilen("").count(), 0);
    }

    #[test]
    fn handshake_praefixe() {
        assert_eq!(handshake_klassifizieren("HELLO"), HandshakeZeile::Hello);
        assert_eq!(handshake_klassifizieren("HELLO Charm 1.9"), HandshakeZeile::Hello);
        assert_eq!(handshake_klassifizieren("ACK"), HandshakeZeile::Ack);
        assert_eq!(handshake_klassifizieren("ACKNOWLEDGED"), HandshakeZeile::Ack);
        assert_eq!(handshake_klassifizieren("NAK"), HandshakeZeile::Unerwartet);
        assert_eq!(handshake_klassifizieren("hello"), HandshakeZeile::Unerwartet);
    }

    #[test]
    fn push_aktiviert_dekodieren() {
        assert_eq!(
            decode_pushes("TASK ACTIVATED 0042 Coding\n"),
            vec![aktiviert(42, "Coding")]
        );
    }

    #[test]
    fn push_deaktiviert_mit_leerzeichen_im_namen() {
        assert_eq!(
            decode_push("TASK DEACTIVATED 0100 Code Review"),
            Some(Event::TaskDeactivated {
                task_id: TaskId(100),
                name: "Code Review".into(),
            })
        );
    }

    #[test]
    fn mehrere_pushes_in_reihenfolge() {
        let events = decode_pushes("TASK ACTIVATED 0001 A\nTASK DEACTIVATED 0001 A\nTASK ACTIVATED 0002 B\n");
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], aktiviert(1, "A"));
        assert!(matches!(events[1], Event::TaskDeactivated { .. }));
        assert_eq!(events[2], aktiviert(2, "B"));
    }

    #[test]
    fn unbekannte_zeilen_erzeugen_keine_events() {
        assert!(decode_pushes("FOO\nBAR 0001 x\nHELLO\nACK\nNAK\n").is_empty());
        assert!(decode_pushes("TASK PAUSED 0001 x\n").is_empty());
    }

    #[test]
    fn defekte_push_zeilen_werden_verworfen() {
        // Zerteilter Read: die zweite Zeile ist abgeschnitten
        let events = decode_pushes("TASK ACTIVATED 0042 Coding\nTASK ACTIV");
        assert_eq!(events, vec![aktiviert(42, "Coding")]);

        assert!(decode_push("TASK ACTIVATED 42 Coding").is_none());
        assert!(decode_push("TASK ACTIVATED 00x2 Coding").is_none());
        assert!(decode_push("TASK ACTIVATED 0042").is_none());
        assert!(decode_push("TASK ACTIVATED 0042Coding").is_none());
    }

    #[test]
    fn recent_antwort_mit_index() {
        let events = decode_response(AntwortArt::Recent, "0001 Email\n0002 Code\n");
        assert_eq!(
            events,
            vec![
                Event::RecentTask {
                    task_id: TaskId(1),
                    name: "Email".into(),
                    index: 0,
                },
                Event::RecentTask {
                    task_id: TaskId(2),
                    name: "Code".into(),
                    index: 1,
                },
            ]
        );
    }

    #[test]
    fn recent_defekte_zeile_behaelt_positionen() {
        let events = decode_response(AntwortArt::Recent, "0001 Email\nxx Code\n0003 Meeting\n");
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], Event::RecentTask { index: 2, .. }));
    }

    #[test]
    fn nak_antwort_ergibt_nichts() {
        assert!(decode_response(AntwortArt::Recent, "NAK\n").is_empty());
        assert!(decode_response(AntwortArt::Status, "NAK\n").is_empty());
    }

    #[test]
    fn nak_zeile_in_antwort_belegt_keine_position() {
        let events = decode_response(AntwortArt::Recent, "0001 Email\nNAK\n0002 Code\n");
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::RecentTask { index: 0, .. }));
        assert!(matches!(events[1], Event::RecentTask { index: 1, .. }));
    }

    #[test]
    fn status_antwort_dekodieren() {
        let events = decode_response(AntwortArt::Status, "0001 120\n0002 abc\n0003 5\n");
        assert_eq!(
            events,
            vec![
                Event::TaskStatus {
                    task_id: TaskId(1),
                    seconds: 120,
                },
                Event::TaskStatus {
                    task_id: TaskId(3),
                    seconds: 5,
                },
            ]
        );
    }

    #[test]
    fn eingestreute_pushes_in_antwort() {
        let events = decode_response(
            AntwortArt::Recent,
            "TASK ACTIVATED 0009 Support\n0001 Email\n",
        );
        assert_eq!(
            events,
            vec![
                aktiviert(9, "Support"),
                Event::RecentTask {
                    task_id: TaskId(1),
                    name: "Email".into(),
                    index: 0,
                },
            ]
        );
    }
}
