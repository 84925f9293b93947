//! Handle auf den Client-Worker
//!
//! Der Aufrufer spricht nur ueber dieses Handle mit dem Worker: Befehle
//! gehen in die begrenzte Warteschlange, Endpunkt und Shutdown laufen ueber
//! `watch`-Kanaele. Ereignisse kommen ueber den bei [`CharmClient::neu`]
//! zurueckgegebenen [`EventReceiver`].

use charm_protocol::Command;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::{ClientConfig, EndpointConfig};
use crate::error::{ClientError, ClientResult};
use crate::queue::{command_queue, event_kanal, CommandSender, EventReceiver, EventSink};
use crate::worker::ClientWorker;

/// Charm-Client
///
/// Besitzt hoechstens einen Worker-Task. Wird das Handle gedroppt, beendet
/// sich der Worker und baut die Verbindung ab.
pub struct CharmClient {
    config: ClientConfig,
    befehle: CommandSender,
    befehle_rx: Option<mpsc::Receiver<Command>>,
    events: EventSink,
    endpunkt_tx: watch::Sender<EndpointConfig>,
    shutdown_tx: watch::Sender<bool>,
    worker: Option<JoinHandle<()>>,
}

impl CharmClient {
    /// Erstellt Client und Ereignis-Empfaenger, startet aber noch keinen Worker
    pub fn neu(config: ClientConfig) -> (Self, EventReceiver) {
        let (befehle, befehle_rx) = command_queue(config.worker.queue_kapazitaet);
        let (events, event_rx) = event_kanal();
        let (endpunkt_tx, _) = watch::channel(config.verbindung.endpunkt());
        let (shutdown_tx, _) = watch::channel(false);

        let client = Self {
            config,
            befehle,
            befehle_rx: Some(befehle_rx),
            events,
            endpunkt_tx,
            shutdown_tx,
            worker: None,
        };
        (client, event_rx)
    }

    /// Startet den Worker-Task auf der aktuellen Tokio-Laufzeit
    pub fn starten(&mut self) -> ClientResult<()> {
        if self.worker.is_some() {
            return Err(ClientError::LaeuftBereits);
        }
        let Some(befehle_rx) = self.befehle_rx.take() else {
            return Err(ClientError::WorkerBeendet);
        };
        let laufzeit = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => {
                self.befehle_rx = Some(befehle_rx);
                return Err(ClientError::KeineLaufzeit);
            }
        };

        let worker = ClientWorker::neu(
            &self.config,
            befehle_rx,
            self.endpunkt_tx.subscribe(),
            self.shutdown_tx.subscribe(),
            self.events.clone(),
        );
        self.worker = Some(laufzeit.spawn(worker.ausfuehren()));

        tracing::debug!(
            endpunkt = %self.endpunkt(),
            kapazitaet = self.befehle.kapazitaet(),
            "Client-Worker-Task gestartet"
        );
        Ok(())
    }

    /// Signalisiert den Shutdown und wartet auf das Ende des Workers
    ///
    /// Danach ist die Verbindung abgebaut. Weitere Befehle werden mit
    /// `ClientError::WorkerBeendet` abgelehnt.
    pub async fn stoppen(&mut self) {
        self.shutdown_tx.send_replace(true);
        self.befehle_rx = None;

        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                tracing::warn!(fehler = %e, "Client-Worker nicht sauber beendet");
            }
        }
    }

    /// Setzt einen neuen Endpunkt; eine laufende Sitzung wird neu aufgebaut
    pub fn set_endpoint(&self, host: impl Into<String>, port: u16) {
        let neu = EndpointConfig::neu(host, port);
        tracing::debug!(endpunkt = %neu, "Neuer Endpunkt gesetzt");
        self.endpunkt_tx.send_replace(neu);
    }

    /// Reicht einen Befehl ein, ohne zu blockieren
    ///
    /// `SetEndpoint` wird direkt als Endpunkt-Wechsel weitergegeben, alle
    /// anderen Befehle gehen in die Warteschlange.
    pub fn submit(&self, befehl: Command) -> ClientResult<()> {
        match befehl {
            Command::SetEndpoint { host, port } => {
                self.set_endpoint(host, port);
                Ok(())
            }
            befehl => self.befehle.einreihen(befehl),
        }
    }

    /// Gibt true zurueck solange der Worker-Task laeuft
    pub fn laeuft(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Aktuell gesetzter Endpunkt
    ///
    /// Ein per Discovery gefundener Host ist hier nicht sichtbar.
    pub fn endpunkt(&self) -> EndpointConfig {
        self.endpunkt_tx.borrow().clone()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Drop for CharmClient {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
    }
}
