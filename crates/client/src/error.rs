//! Fehlertypen fuer den Charm-Client
//!
//! `ClientError` ist fuer den Aufrufer sichtbar. `SessionFehler` bleibt im
//! Worker: jeder Sitzungsfehler endet im Zustand `Disconnected` und wird nur
//! als Ereignis (`ConnectionLost`) gemeldet, nie als Fehler nach aussen.

use thiserror::Error;

use crate::config::EndpointConfig;

/// Fehler, die der Aufrufer synchron zurueckbekommt
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Befehlswarteschlange voll (Kapazitaet {kapazitaet})")]
    WarteschlangeVoll { kapazitaet: usize },

    #[error("Client-Worker laeuft nicht")]
    WorkerBeendet,

    #[error("Client-Worker laeuft bereits")]
    LaeuftBereits,

    #[error("Keine Tokio-Laufzeit verfuegbar")]
    KeineLaufzeit,

    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Grund fuer das vorzeitige Verlassen eines blockierenden Schritts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unterbrechung {
    /// Worker soll beendet werden
    Shutdown,
    /// Aufrufer hat einen neuen Endpunkt gesetzt
    NeuerEndpunkt(EndpointConfig),
}

/// Fehler innerhalb einer Sitzung
#[derive(Debug, Error)]
pub(crate) enum SessionFehler {
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    #[error("Verbindung vom Server getrennt")]
    Getrennt,

    #[error("Handshake fehlgeschlagen: {0}")]
    Handshake(String),

    #[error("Zeitlimit ueberschritten: {0}")]
    Zeitlimit(&'static str),

    #[error("Unterbrochen: {0:?}")]
    Unterbrochen(Unterbrechung),
}

pub(crate) type SessionResult<T> = Result<T, SessionFehler>;
