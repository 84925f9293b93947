//! Identifikationstypen fuer Charm
//!
//! Task-IDs sind auf Host-Seite gewoehnliche Ganzzahlen. Auf dem Draht
//! erscheinen sie in Server-Datensaetzen immer als genau vier Ziffern
//! mit fuehrenden Nullen (`0042`).

use serde::{Deserialize, Serialize};

/// Anzahl der Ziffern einer Task-ID im Wire-Format
pub const TASK_ID_BREITE: usize = 4;

/// Eindeutige Task-ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u32);

impl TaskId {
    /// Gibt den inneren Zahlenwert zurueck
    pub fn inner(&self) -> u32 {
        self.0
    }

    /// Parst eine Task-ID aus exakt vier ASCII-Ziffern
    ///
    /// Die Breite wird vor der Konvertierung geprueft; `42`, `00042` oder
    /// `00a2` werden abgelehnt.
    pub fn aus_feld(feld: &str) -> Option<Self> {
        if feld.len() != TASK_ID_BREITE || !feld.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        feld.parse::<u32>().ok().map(Self)
    }
}

impl From<u32> for TaskId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Anzeige wie in der Task-Liste: vierstellig mit fuehrenden Nullen
impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// Formatiert eine Laufzeit in Sekunden als `MM:SS`
///
/// Minuten werden nicht auf Stunden umgebrochen (`3725` -> `62:05`).
pub fn format_dauer(sekunden: u64) -> String {
    format!("{:02}:{:02}", sekunden / 60, sekunden % 60)
}
