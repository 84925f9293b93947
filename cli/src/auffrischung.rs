//! Automatische Abfragen waehrend einer Sitzung
//!
//! Nach jedem Verbindungsaufbau wird die Recent-Liste geholt. Solange die
//! Sitzung steht, laeuft eine periodische Status-Abfrage.

use std::time::Duration;

use charm_protocol::{Command, Event};

#[derive(Debug)]
pub struct Auffrischung {
    recent_anzahl: u32,
    status_intervall: Option<Duration>,
    verbunden: bool,
}

impl Auffrischung {
    /// `status_intervall_s = 0` schaltet die Status-Abfrage ab
    pub fn neu(recent_anzahl: u32, status_intervall_s: u64) -> Self {
        Self {
            recent_anzahl,
            status_intervall: (status_intervall_s > 0)
                .then(|| Duration::from_secs(status_intervall_s)),
            verbunden: false,
        }
    }

    /// Befehle, die auf ein Ereignis hin abgesetzt werden
    pub fn nach_event(&mut self, event: &Event) -> Vec<Command> {
        if !event.ist_lebenszyklus() {
            return Vec::new();
        }

        match event {
            Event::ConnectionEstablished => {
                self.verbunden = true;
                let mut befehle = Vec::new();
                if self.recent_anzahl > 0 {
                    befehle.push(Command::ListRecent {
                        offset: 0,
                        count: self.recent_anzahl,
                    });
                }
                if self.status_intervall.is_some() {
                    befehle.push(Command::QueryStatus);
                }
                befehle
            }
            Event::ConnectionClosed | Event::ConnectionLost => {
                self.verbunden = false;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    /// Gibt true zurueck wenn der Status-Takt gerade Abfragen ausloest
    pub fn status_aktiv(&self) -> bool {
        self.verbunden && self.status_intervall.is_some()
    }

    /// Takt fuer die Status-Abfrage (auch wenn abgeschaltet, dann ungenutzt)
    pub fn takt(&self) -> Duration {
        self.status_intervall.unwrap_or(Duration::from_secs(60))
    }
}
