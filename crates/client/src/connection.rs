//! TCP-Verbindung zum Charm-Server
//!
//! Besitzt Socket und Stream-Haelften einer Sitzung. Eine `Verbindung`
//! entsteht bei jedem erfolgreichen Verbindungsversuch und wird beim Wechsel
//! nach `Disconnected` durch [`Verbindung::abbauen`] verbraucht. Kein Handle
//! ueberlebt einen Zustandswechsel.
//!
//! ## State Machine
//! ```text
//! Disconnected --connect--> Handshaking --HELLO/READY/ACK--> Active
//!      ^                         |                             |
//!      +------ Verloren / Beendet +-----------------------------+
//! ```

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use charm_protocol::wire::{self, HandshakeZeile, READY_ZEILE};
use charm_protocol::Event;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::config::{EndpointConfig, VerbindungsEinstellungen};
use crate::error::{SessionFehler, SessionResult};

/// Lesepuffer waehrend des Handshakes
pub const HANDSHAKE_PUFFER: usize = 512;

// ---------------------------------------------------------------------------
// Verbindungszustand
// ---------------------------------------------------------------------------

/// Zustand der Verbindung, gehoert exklusiv dem Worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Keine Verbindung, Verbindungsaufbau laeuft
    Disconnected,
    /// TCP verbunden, Handshake laeuft
    Handshaking,
    /// Befehlssitzung aktiv
    Active,
}

/// Ausloeser eines Zustandswechsels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uebergang {
    /// TCP-Verbindung aufgebaut
    Verbunden,
    /// `ACK` nach `READY` empfangen
    HandshakeAbgeschlossen,
    /// I/O-Fehler, EOF, Zeitlimit oder ungueltiger Handshake
    Verloren,
    /// Geordneter Abbau (neuer Endpunkt, Shutdown)
    Beendet,
}

impl ConnectionState {
    /// Berechnet Folgezustand und Seiteneffekt-Ereignis eines Wechsels
    ///
    /// - Handshaking -> Active meldet `ConnectionEstablished`
    /// - Verlust aus Handshaking oder Active meldet `ConnectionLost`
    /// - Geordneter Abbau meldet `ConnectionClosed` nur beim Verlassen von Active
    pub fn nach(self, uebergang: Uebergang) -> (ConnectionState, Option<Event>) {
        use ConnectionState::*;

        match (self, uebergang) {
            (_, Uebergang::Verbunden) => (Handshaking, None),
            (Handshaking, Uebergang::HandshakeAbgeschlossen) => {
                (Active, Some(Event::ConnectionEstablished))
            }
            (zustand, Uebergang::HandshakeAbgeschlossen) => (zustand, None),
            (Disconnected, Uebergang::Verloren | Uebergang::Beendet) => (Disconnected, None),
            (_, Uebergang::Verloren) => (Disconnected, Some(Event::ConnectionLost)),
            (Active, Uebergang::Beendet) => (Disconnected, Some(Event::ConnectionClosed)),
            (Handshaking, Uebergang::Beendet) => (Disconnected, None),
        }
    }
}

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// Wartezeiten zwischen fehlgeschlagenen Verbindungsversuchen
///
/// Beginnt bei `start` und waechst pro Fehlversuch linear um `schritt`.
/// Ohne `max` gibt es keine Obergrenze.
#[derive(Debug, Clone)]
pub struct Backoff {
    start: Duration,
    schritt: Duration,
    max: Option<Duration>,
    aktuell: Duration,
}

impl Backoff {
    pub fn neu(start: Duration, schritt: Duration, max: Option<Duration>) -> Self {
        Self {
            start,
            schritt,
            max,
            aktuell: start,
        }
    }

    pub fn aus_einstellungen(einstellungen: &VerbindungsEinstellungen) -> Self {
        Self::neu(
            Duration::from_millis(einstellungen.backoff_start_ms),
            Duration::from_millis(einstellungen.backoff_schritt_ms),
            einstellungen.max_backoff_ms.map(Duration::from_millis),
        )
    }

    /// Gibt die naechste Wartezeit zurueck und erhoeht sie fuer den Folgeversuch
    pub fn naechste(&mut self) -> Duration {
        let pause = match self.max {
            Some(max) => self.aktuell.min(max),
            None => self.aktuell,
        };
        self.aktuell = self.aktuell.saturating_add(self.schritt);
        pause
    }

    /// Nach Erfolg oder neuem Endpunkt wieder bei `start` beginnen
    pub fn zuruecksetzen(&mut self) {
        self.aktuell = self.start;
    }
}

// ---------------------------------------------------------------------------
// Verbindung
// ---------------------------------------------------------------------------

/// Offene TCP-Verbindung einer Sitzung
#[derive(Debug)]
pub(crate) struct Verbindung {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    endpunkt: EndpointConfig,
}

impl Verbindung {
    /// Baut eine TCP-Verbindung zum Endpunkt auf
    pub(crate) async fn aufbauen(endpunkt: &EndpointConfig, timeout: Duration) -> io::Result<Self> {
        let connect = TcpStream::connect((endpunkt.host.as_str(), endpunkt.port));
        let stream = tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "Verbindungsaufbau Zeitlimit"))??;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(fehler = %e, "TCP_NODELAY konnte nicht gesetzt werden");
        }

        tracing::info!(endpunkt = %endpunkt, "TCP-Verbindung hergestellt");
        let (reader, writer) = stream.into_split();

        Ok(Self {
            reader,
            writer,
            endpunkt: endpunkt.clone(),
        })
    }

    /// Fuehrt den Handshake `HELLO` -> `READY` -> `ACK` durch
    ///
    /// Jede Abweichung ist fuer die Sitzung fatal. Zeilen, die nach dem `ACK`
    /// im selben Read angekommen sind, werden als Push-Meldungen dekodiert
    /// und zurueckgegeben.
    pub(crate) async fn handshake(&mut self) -> SessionResult<Vec<Event>> {
        let mut buf = [0u8; HANDSHAKE_PUFFER];
        let mut ausstehend = VecDeque::new();

        let einladung = self.naechste_zeile(&mut buf, &mut ausstehend).await?;
        if wire::handshake_klassifizieren(&einladung) != HandshakeZeile::Hello {
            return Err(SessionFehler::Handshake(format!(
                "HELLO erwartet, erhalten: {einladung}"
            )));
        }

        self.senden(READY_ZEILE).await?;

        let bestaetigung = self.naechste_zeile(&mut buf, &mut ausstehend).await?;
        if wire::handshake_klassifizieren(&bestaetigung) != HandshakeZeile::Ack {
            return Err(SessionFehler::Handshake(format!(
                "ACK erwartet, erhalten: {bestaetigung}"
            )));
        }

        let rest: Vec<String> = ausstehend.into_iter().collect();
        Ok(wire::decode_pushes(&rest.join("\n")))
    }

    async fn naechste_zeile(
        &mut self,
        buf: &mut [u8],
        ausstehend: &mut VecDeque<String>,
    ) -> SessionResult<String> {
        loop {
            if let Some(zeile) = ausstehend.pop_front() {
                return Ok(zeile);
            }
            let text = self.lesen(buf).await?;
            ausstehend.extend(wire::zeilen(&text).map(str::to_string));
        }
    }

    /// Schreibt eine Zeile und leert den Puffer
    pub(crate) async fn senden(&mut self, zeile: &str) -> SessionResult<()> {
        self.writer.write_all(zeile.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Blockierendes Lesen; EOF ist ein Verbindungsverlust
    pub(crate) async fn lesen(&mut self, buf: &mut [u8]) -> SessionResult<String> {
        let n = self.reader.read(buf).await?;
        if n == 0 {
            return Err(SessionFehler::Getrennt);
        }
        Ok(String::from_utf8_lossy(&buf[..n]).into_owned())
    }

    /// Nicht-blockierendes Lesen
    ///
    /// `Ok(None)` wenn gerade keine Daten anliegen.
    pub(crate) fn try_lesen(&mut self, buf: &mut [u8]) -> SessionResult<Option<String>> {
        match self.reader.try_read(buf) {
            Ok(0) => Err(SessionFehler::Getrennt),
            Ok(n) => Ok(Some(String::from_utf8_lossy(&buf[..n]).into_owned())),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Wartet, bis eingehende Daten (oder EOF) anliegen
    pub(crate) async fn lesbar(&self) -> io::Result<()> {
        self.reader.readable().await
    }

    /// Baut die Verbindung ab
    ///
    /// Jeder Schritt wird versucht, auch wenn ein frueherer fehlschlaegt.
    /// Fehler werden nur protokolliert.
    pub(crate) async fn abbauen(self) {
        let Self {
            reader,
            mut writer,
            endpunkt,
        } = self;

        if let Err(e) = writer.write_all(wire::BYE_ZEILE.as_bytes()).await {
            tracing::debug!(endpunkt = %endpunkt, fehler = %e, "BYE konnte nicht gesendet werden");
        }
        if let Err(e) = writer.flush().await {
            tracing::debug!(endpunkt = %endpunkt, fehler = %e, "Flush beim Abbau fehlgeschlagen");
        }
        if let Err(e) = writer.shutdown().await {
            tracing::debug!(endpunkt = %endpunkt, fehler = %e, "Schreibseite nicht sauber geschlossen");
        }
        drop(writer);
        drop(reader);

        tracing::info!(endpunkt = %endpunkt, "TCP-Verbindung getrennt");
    }
}
