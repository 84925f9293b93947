//! charm-client – Verbindungs-Engine des Charm-Clients
//!
//! Haelt eine langlebige TCP-Sitzung zu einem Charm-Server: Verbindungsaufbau
//! mit Backoff und UDP-Discovery, Handshake, Befehlsausfuehrung und
//! Dekodierung der Server-Meldungen.
//!
//! ## Architektur
//! - `client`: Handle fuer den Aufrufer (Befehle rein, Ereignisse raus)
//! - `worker`: einzige Schleife, besitzt Zustand und Socket
//! - `connection`: Zustandsautomat, Backoff, TCP-Verbindung
//! - `discovery`: einmaliger UDP-Broadcast-Lauscher
//! - `queue`: Befehlswarteschlange und Ereignis-Senke
//! - `config`: TOML-Konfiguration

pub mod client;
pub mod config;
pub mod connection;
pub mod discovery;
pub mod error;
pub mod queue;
mod worker;

pub use charm_protocol::{Command, Event, TaskId};
pub use client::CharmClient;
pub use config::{ClientConfig, EndpointConfig};
pub use connection::ConnectionState;
pub use error::{ClientError, ClientResult};
pub use queue::EventReceiver;
