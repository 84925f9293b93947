//! Steuerungsnachrichten zwischen Aufrufer und Client-Worker
//!
//! ## Design
//! - `Command`: vom Aufrufer erzeugt, vom Worker genau einmal verbraucht
//! - `Event`: vom Worker erzeugt, in Ankunftsreihenfolge an den Aufrufer
//! - Beide sind unveraenderliche Werte (Single-Owner-Uebergabe ueber Kanaele)
//! - Tagged Enums fuer typsichere Serialisierung (z.B. JSON-Ausgabe im CLI)

use serde::{Deserialize, Serialize};

use crate::types::TaskId;

// ---------------------------------------------------------------------------
// Befehle (Aufrufer -> Worker)
// ---------------------------------------------------------------------------

/// Befehl an den Client-Worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Neuen Server-Endpunkt setzen (erzwingt Neuaufbau der Verbindung)
    SetEndpoint { host: String, port: u16 },
    /// Task starten
    Start { task_id: TaskId },
    /// Task stoppen
    Stop { task_id: TaskId },
    /// Zuletzt benutzte Tasks abfragen
    ListRecent { offset: u32, count: u32 },
    /// Laufzeiten der aktiven Tasks abfragen
    QueryStatus,
}

/// Art einer synchronen Server-Antwort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AntwortArt {
    /// Antwort auf `RECENT`: `<id4> <name>` pro Zeile
    Recent,
    /// Antwort auf `STATUS`: `<id4> <sekunden>` pro Zeile
    Status,
}

impl Command {
    /// Gibt zurueck ob der Server auf diesen Befehl synchron antwortet
    pub fn erwartete_antwort(&self) -> Option<AntwortArt> {
        match self {
            Self::ListRecent { .. } => Some(AntwortArt::Recent),
            Self::QueryStatus => Some(AntwortArt::Status),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Ereignisse (Worker -> Aufrufer)
// ---------------------------------------------------------------------------

/// Ereignis aus dem Client-Worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Server meldet: Task wurde aktiviert
    TaskActivated { task_id: TaskId, name: String },
    /// Server meldet: Task wurde deaktiviert
    TaskDeactivated { task_id: TaskId, name: String },
    /// Eintrag der Recent-Liste, `index` = Zeilenposition in der Antwort
    RecentTask {
        task_id: TaskId,
        name: String,
        index: usize,
    },
    /// Laufzeit eines aktiven Tasks
    TaskStatus { task_id: TaskId, seconds: u64 },
    /// Handshake abgeschlossen, Befehlssitzung aktiv
    ConnectionEstablished,
    /// Aktive Sitzung geordnet beendet
    ConnectionClosed,
    /// Verbindung durch Fehler verloren, neuer Versuch folgt
    ConnectionLost,
    /// Discovery-Socket offen, warte auf Broadcast
    DiscoveryStarted,
    /// Server per Broadcast gefunden
    DiscoveryFound { host: String },
}

impl Event {
    /// Gibt true zurueck fuer Verbindungs-Lebenszyklus-Ereignisse
    pub fn ist_lebenszyklus(&self) -> bool {
        matches!(
            self,
            Self::ConnectionEstablished | Self::ConnectionClosed | Self::ConnectionLost
        )
    }
}
