//! Client-Worker – die einzige Schleife, die die Verbindung treibt
//!
//! Der Worker ist alleiniger Besitzer von Verbindungszustand, Socket und
//! Stream-Haelften. Pro Iteration fuehrt er genau einen Makro-Schritt des
//! aktuellen Zustands aus:
//!
//! - `Disconnected`: Verbindungsaufbau, bei Fehlschlag Discovery und Backoff
//! - `Handshaking`: `HELLO` -> `READY` -> `ACK` unter Zeitlimit
//! - `Active`: eingehende Daten pruefen, auf Befehl warten, Befehl ausfuehren
//!
//! Jeder blockierende Punkt beobachtet Shutdown und Endpunkt-Wechsel per
//! `tokio::select!`. Alle Sitzungsfehler enden in `Disconnected`.

use std::time::Duration;

use charm_protocol::{wire, Command};
use tokio::sync::{mpsc, watch};

use crate::config::{ClientConfig, EndpointConfig, VerbindungsEinstellungen};
use crate::connection::{Backoff, ConnectionState, Uebergang, Verbindung};
use crate::discovery;
use crate::error::{SessionFehler, SessionResult, Unterbrechung};
use crate::queue::EventSink;

/// Lesepuffer im aktiven Zustand
pub const AKTIV_PUFFER: usize = 2048;

pub(crate) struct ClientWorker {
    einstellungen: VerbindungsEinstellungen,
    poll_intervall: Duration,
    endpunkt: EndpointConfig,
    zustand: ConnectionState,
    verbindung: Option<Verbindung>,
    befehle: mpsc::Receiver<Command>,
    endpunkt_rx: watch::Receiver<EndpointConfig>,
    shutdown_rx: watch::Receiver<bool>,
    events: EventSink,
    backoff: Backoff,
    puffer: Vec<u8>,
}

impl ClientWorker {
    pub(crate) fn neu(
        config: &ClientConfig,
        befehle: mpsc::Receiver<Command>,
        endpunkt_rx: watch::Receiver<EndpointConfig>,
        shutdown_rx: watch::Receiver<bool>,
        events: EventSink,
    ) -> Self {
        let endpunkt = endpunkt_rx.borrow().clone();
        Self {
            einstellungen: config.verbindung.clone(),
            poll_intervall: config.worker.poll_intervall(),
            endpunkt,
            zustand: ConnectionState::Disconnected,
            verbindung: None,
            befehle,
            endpunkt_rx,
            shutdown_rx,
            events,
            backoff: Backoff::aus_einstellungen(&config.verbindung),
            puffer: vec![0u8; AKTIV_PUFFER],
        }
    }

    /// Laeuft bis zum Shutdown und baut danach die Verbindung ab
    pub(crate) async fn ausfuehren(mut self) {
        tracing::info!(endpunkt = %self.endpunkt, "Client-Worker gestartet");

        loop {
            let schritt = match self.zustand {
                ConnectionState::Disconnected => self.verbindungs_zyklus().await,
                ConnectionState::Handshaking => self.handshake_schritt().await,
                ConnectionState::Active => self.aktiv_schritt().await,
            };

            match schritt {
                Ok(()) => {}
                Err(SessionFehler::Unterbrochen(Unterbrechung::Shutdown)) => break,
                Err(SessionFehler::Unterbrochen(Unterbrechung::NeuerEndpunkt(neu))) => {
                    tracing::info!(
                        alt = %self.endpunkt,
                        neu = %neu,
                        "Endpunkt geaendert, Verbindung wird neu aufgebaut"
                    );
                    self.endpunkt = neu;
                    self.backoff.zuruecksetzen();
                    self.uebergang(Uebergang::Beendet).await;
                }
                Err(e) => {
                    tracing::warn!(
                        endpunkt = %self.endpunkt,
                        zustand = ?self.zustand,
                        fehler = %e,
                        "Verbindung verloren"
                    );
                    self.uebergang(Uebergang::Verloren).await;
                }
            }
        }

        self.uebergang(Uebergang::Beendet).await;
        tracing::info!("Client-Worker beendet");
    }

    /// Fuehrt einen Zustandswechsel aus
    ///
    /// Beim Eintritt in `Disconnected` wird die Verbindung immer abgebaut.
    async fn uebergang(&mut self, uebergang: Uebergang) {
        let (neu, event) = self.zustand.nach(uebergang);

        if neu == ConnectionState::Disconnected {
            if let Some(verbindung) = self.verbindung.take() {
                verbindung.abbauen().await;
            }
        }

        if neu != self.zustand {
            tracing::debug!(von = ?self.zustand, nach = ?neu, ?uebergang, "Zustandswechsel");
        }
        self.zustand = neu;

        if let Some(event) = event {
            self.events.melden(event);
        }
    }

    // -----------------------------------------------------------------------
    // Disconnected
    // -----------------------------------------------------------------------

    /// Versucht zu verbinden, bis es gelingt oder unterbrochen wird
    async fn verbindungs_zyklus(&mut self) -> SessionResult<()> {
        loop {
            let versuch =
                Verbindung::aufbauen(&self.endpunkt, self.einstellungen.connect_timeout());
            let ergebnis = tokio::select! {
                biased;
                u = warte_auf_unterbrechung(&mut self.shutdown_rx, &mut self.endpunkt_rx) => {
                    return Err(SessionFehler::Unterbrochen(u));
                }
                r = versuch => r,
            };

            match ergebnis {
                Ok(verbindung) => {
                    self.backoff.zuruecksetzen();
                    self.verbindung = Some(verbindung);
                    self.uebergang(Uebergang::Verbunden).await;
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        endpunkt = %self.endpunkt,
                        fehler = %e,
                        "Verbindungsaufbau fehlgeschlagen"
                    );
                }
            }

            let port = self.einstellungen.discovery_port_fuer(&self.endpunkt);
            let suche = discovery::discover(
                port,
                self.einstellungen.discovery_timeout(),
                &self.events,
            );
            let gefunden = tokio::select! {
                biased;
                u = warte_auf_unterbrechung(&mut self.shutdown_rx, &mut self.endpunkt_rx) => {
                    return Err(SessionFehler::Unterbrochen(u));
                }
                h = suche => h,
            };
            if let Some(host) = gefunden {
                self.endpunkt.host = host;
            }

            let pause = self.backoff.naechste();
            tracing::debug!(
                pause_ms = pause.as_millis() as u64,
                endpunkt = %self.endpunkt,
                "Naechster Verbindungsversuch nach Pause"
            );
            tokio::select! {
                biased;
                u = warte_auf_unterbrechung(&mut self.shutdown_rx, &mut self.endpunkt_rx) => {
                    return Err(SessionFehler::Unterbrochen(u));
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }

    // -----------------------------------------------------------------------
    // Handshaking
    // -----------------------------------------------------------------------

    async fn handshake_schritt(&mut self) -> SessionResult<()> {
        let Some(verbindung) = self.verbindung.as_mut() else {
            return Err(SessionFehler::Getrennt);
        };

        let zeitlimit = self.einstellungen.handshake_timeout();
        let pushes = tokio::select! {
            biased;
            u = warte_auf_unterbrechung(&mut self.shutdown_rx, &mut self.endpunkt_rx) => {
                return Err(SessionFehler::Unterbrochen(u));
            }
            r = tokio::time::timeout(zeitlimit, verbindung.handshake()) => {
                r.map_err(|_| SessionFehler::Zeitlimit("Handshake"))??
            }
        };

        tracing::info!(endpunkt = %self.endpunkt, "Handshake abgeschlossen");
        self.uebergang(Uebergang::HandshakeAbgeschlossen).await;
        for event in pushes {
            self.events.melden(event);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Active
    // -----------------------------------------------------------------------

    async fn aktiv_schritt(&mut self) -> SessionResult<()> {
        let Some(verbindung) = self.verbindung.as_mut() else {
            return Err(SessionFehler::Getrennt);
        };

        if let Some(text) = verbindung.try_lesen(&mut self.puffer)? {
            for event in wire::decode_pushes(&text) {
                self.events.melden(event);
            }
        }

        let befehl = tokio::select! {
            biased;
            u = warte_auf_unterbrechung(&mut self.shutdown_rx, &mut self.endpunkt_rx) => {
                return Err(SessionFehler::Unterbrochen(u));
            }
            b = self.befehle.recv() => match b {
                Some(befehl) => befehl,
                None => return Err(SessionFehler::Unterbrochen(Unterbrechung::Shutdown)),
            },
            r = verbindung.lesbar() => {
                r?;
                return Ok(());
            }
            _ = tokio::time::sleep(self.poll_intervall) => return Ok(()),
        };

        self.befehl_ausfuehren(befehl).await
    }

    async fn befehl_ausfuehren(&mut self, befehl: Command) -> SessionResult<()> {
        if let Command::SetEndpoint { host, port } = &befehl {
            let neu = EndpointConfig::neu(host.clone(), *port);
            return Err(SessionFehler::Unterbrochen(Unterbrechung::NeuerEndpunkt(neu)));
        }

        let Some(zeile) = wire::encode_command(&befehl) else {
            return Ok(());
        };
        let Some(verbindung) = self.verbindung.as_mut() else {
            return Err(SessionFehler::Getrennt);
        };

        tracing::debug!(befehl = zeile.trim_end(), "Sende Befehl");
        verbindung.senden(&zeile).await?;

        let Some(art) = befehl.erwartete_antwort() else {
            return Ok(());
        };

        let text = tokio::select! {
            biased;
            u = warte_auf_unterbrechung(&mut self.shutdown_rx, &mut self.endpunkt_rx) => {
                return Err(SessionFehler::Unterbrochen(u));
            }
            r = verbindung.lesen(&mut self.puffer) => r?,
        };

        for event in wire::decode_response(art, &text) {
            self.events.melden(event);
        }
        Ok(())
    }
}

/// Wartet auf Shutdown oder einen neuen Endpunkt
///
/// Ist einer der Sender verschwunden (Handle gedroppt), gilt das als Shutdown.
async fn warte_auf_unterbrechung(
    shutdown_rx: &mut watch::Receiver<bool>,
    endpunkt_rx: &mut watch::Receiver<EndpointConfig>,
) -> Unterbrechung {
    loop {
        if *shutdown_rx.borrow_and_update() {
            return Unterbrechung::Shutdown;
        }

        tokio::select! {
            biased;
            r = shutdown_rx.changed() => {
                if r.is_err() {
                    return Unterbrechung::Shutdown;
                }
            }
            r = endpunkt_rx.changed() => {
                return match r {
                    Ok(()) => Unterbrechung::NeuerEndpunkt(endpunkt_rx.borrow_and_update().clone()),
                    Err(_) => Unterbrechung::Shutdown,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{command_queue, event_kanal};
    use charm_protocol::Event;

    #[tokio::test]
    async fn shutdown_signal_wird_erkannt() {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let (_endpunkt_tx, mut endpunkt_rx) = watch::channel(EndpointConfig::default());

        shutdown_tx.send_replace(true);
        let u = warte_auf_unterbrechung(&mut shutdown_rx, &mut endpunkt_rx).await;
        assert_eq!(u, Unterbrechung::Shutdown);
    }

    #[tokio::test]
    async fn neuer_endpunkt_wird_erkannt() {
        let (_shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let (endpunkt_tx, mut endpunkt_rx) = watch::channel(EndpointConfig::default());

        endpunkt_tx.send_replace(EndpointConfig::neu("charm.local", 6000));
        let u = warte_auf_unterbrechung(&mut shutdown_rx, &mut endpunkt_rx).await;
        assert_eq!(
            u,
            Unterbrechung::NeuerEndpunkt(EndpointConfig::neu("charm.local", 6000))
        );
    }

    #[tokio::test]
    async fn verschwundener_sender_gilt_als_shutdown() {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let (endpunkt_tx, mut endpunkt_rx) = watch::channel(EndpointConfig::default());
        drop(shutdown_tx);
        drop(endpunkt_tx);

        let u = warte_auf_unterbrechung(&mut shutdown_rx, &mut endpunkt_rx).await;
        assert_eq!(u, Unterbrechung::Shutdown);
    }

    #[tokio::test]
    async fn shutdown_waehrend_backoff_ohne_lebenszyklus_event() {
        // Port ohne Server: Verbindungsaufbau scheitert, Worker haengt im Backoff
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut config = ClientConfig::default();
        config.verbindung.host = "127.0.0.1".into();
        config.verbindung.port = port;
        config.verbindung.discovery_timeout_ms = 20;

        let (_befehle_tx, befehle_rx) = command_queue(4);
        let (endpunkt_tx, endpunkt_rx) = watch::channel(config.verbindung.endpunkt());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (sink, mut events) = event_kanal();

        let worker = ClientWorker::neu(&config, befehle_rx, endpunkt_rx, shutdown_rx, sink);
        let handle = tokio::spawn(worker.ausfuehren());

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send_replace(true);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("Worker muss nach Shutdown enden")
            .unwrap();
        drop(endpunkt_tx);

        while let Ok(event) = events.try_recv() {
            assert!(
                !event.ist_lebenszyklus(),
                "unerwartetes Lebenszyklus-Ereignis: {event:?}"
            );
            assert!(matches!(
                event,
                Event::DiscoveryStarted | Event::DiscoveryFound { .. }
            ));
        }
    }
}
