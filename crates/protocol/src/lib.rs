//! charm-protocol – Nachrichtentypen und Wire-Format des Charm-Clients
//!
//! Dieses Crate definiert die Befehle und Ereignisse, die zwischen Aufrufer
//! und Client-Worker ausgetauscht werden, sowie die reine (I/O-freie)
//! Kodierung und Dekodierung des zeilenbasierten Server-Protokolls.

pub mod control;
pub mod types;
pub mod wire;

pub use control::{AntwortArt, Command, Event};
pub use types::{format_dauer, TaskId};
