//! Befehlswarteschlange und Ereignis-Senke
//!
//! Die Warteschlange ist die einzige geteilte Struktur zwischen Aufrufer und
//! Worker: beliebig viele Produzenten, genau ein Konsument (der Worker).
//! Ist sie voll, wird der Befehl abgelehnt und der Aufrufer erhaelt
//! `ClientError::WarteschlangeVoll`. Es wird nie still verworfen.
//!
//! Ereignisse laufen ueber einen unbegrenzten Kanal, damit der Worker nie
//! auf einen langsamen Konsumenten warten muss.

use charm_protocol::{Command, Event};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::{ClientError, ClientResult};

/// Empfangsseite der Ereignisse (gehoert dem Aufrufer)
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// Produzentenseite der Befehlswarteschlange
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::Sender<Command>,
    kapazitaet: usize,
}

impl CommandSender {
    /// Reiht einen Befehl ein, ohne zu blockieren
    pub fn einreihen(&self, befehl: Command) -> ClientResult<()> {
        match self.tx.try_send(befehl) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(befehl)) => {
                tracing::warn!(
                    ?befehl,
                    kapazitaet = self.kapazitaet,
                    "Befehlswarteschlange voll, Befehl abgelehnt"
                );
                Err(ClientError::WarteschlangeVoll {
                    kapazitaet: self.kapazitaet,
                })
            }
            Err(TrySendError::Closed(_)) => Err(ClientError::WorkerBeendet),
        }
    }

    /// Kapazitaet der Warteschlange
    pub fn kapazitaet(&self) -> usize {
        self.kapazitaet
    }
}

/// Erstellt eine begrenzte Befehlswarteschlange
pub fn command_queue(kapazitaet: usize) -> (CommandSender, mpsc::Receiver<Command>) {
    let (tx, rx) = mpsc::channel(kapazitaet);
    (CommandSender { tx, kapazitaet }, rx)
}

/// Senke fuer alle Worker-Ereignisse
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventSink {
    /// Leitet ein Ereignis an den Aufrufer weiter
    ///
    /// Hat der Aufrufer den Empfaenger fallen lassen, wird das Ereignis
    /// verworfen. Der Worker laeuft trotzdem weiter.
    pub fn melden(&self, event: Event) {
        tracing::trace!(?event, "Ereignis gemeldet");
        if self.tx.send(event).is_err() {
            tracing::trace!("Kein Ereignis-Empfaenger mehr vorhanden");
        }
    }
}

/// Erstellt den Ereignis-Kanal
pub fn event_kanal() -> (EventSink, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink { tx }, rx)
}
