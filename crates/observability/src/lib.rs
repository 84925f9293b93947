//! # charm-observability
//!
//! Structured Logging via tracing-subscriber fuer den Charm-Client.
//! Level und Format kommen aus der Konfiguration und koennen per
//! Umgebungsvariable ueberschrieben werden.

pub mod logging;

pub use logging::{logging_initialisieren, LogFormat, LoggingFehler};
