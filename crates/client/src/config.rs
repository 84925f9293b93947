//! Client-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Client ohne Konfigurationsdatei
//! lauffaehig ist.

use std::time::Duration;

use charm_observability::logging::{log_format_gueltig, log_level_gueltig};
use serde::{Deserialize, Serialize};

use crate::discovery::DISCOVERY_TIMEOUT;
use crate::error::{ClientError, ClientResult};

/// Standard-Port des Charm-Servers
pub const STANDARD_PORT: u16 = 5323;

/// Ziel der TCP-Verbindung
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub host: String,
    pub port: u16,
}

impl EndpointConfig {
    pub fn neu(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self::neu("localhost", STANDARD_PORT)
    }
}

impl std::fmt::Display for EndpointConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Vollstaendige Client-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Verbindungs-Einstellungen (Endpunkt, Zeitlimits, Backoff)
    pub verbindung: VerbindungsEinstellungen,
    /// Worker-Einstellungen (Warteschlange, Polling)
    pub worker: WorkerEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Verbindungs-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerbindungsEinstellungen {
    /// Hostname oder IP des Servers
    pub host: String,
    /// TCP-Port des Servers
    pub port: u16,
    /// UDP-Port fuer Discovery (leer = TCP-Port)
    pub discovery_port: Option<u16>,
    /// Zeitlimit pro Verbindungsversuch
    pub connect_timeout_ms: u64,
    /// Zeitlimit fuer den gesamten Handshake
    pub handshake_timeout_ms: u64,
    /// Wartezeit auf ein Discovery-Paket
    pub discovery_timeout_ms: u64,
    /// Erste Wartezeit nach einem fehlgeschlagenen Versuch
    pub backoff_start_ms: u64,
    /// Zuwachs der Wartezeit pro weiterem Fehlversuch
    pub backoff_schritt_ms: u64,
    /// Obergrenze der Wartezeit (leer = unbegrenzt)
    pub max_backoff_ms: Option<u64>,
}

impl Default for VerbindungsEinstellungen {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: STANDARD_PORT,
            discovery_port: None,
            connect_timeout_ms: 5_000,
            handshake_timeout_ms: 10_000,
            discovery_timeout_ms: DISCOVERY_TIMEOUT.as_millis() as u64,
            backoff_start_ms: 500,
            backoff_schritt_ms: 500,
            max_backoff_ms: None,
        }
    }
}

impl VerbindungsEinstellungen {
    /// Gibt den konfigurierten Endpunkt zurueck
    pub fn endpunkt(&self) -> EndpointConfig {
        EndpointConfig::neu(self.host.clone(), self.port)
    }

    /// Discovery-Port fuer einen Endpunkt (Standard: dessen TCP-Port)
    pub fn discovery_port_fuer(&self, endpunkt: &EndpointConfig) -> u16 {
        self.discovery_port.unwrap_or(endpunkt.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }
}

/// Worker-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerEinstellungen {
    /// Kapazitaet der Befehlswarteschlange
    pub queue_kapazitaet: usize,
    /// Maximale Wartezeit auf einen Befehl im aktiven Zustand
    pub poll_intervall_ms: u64,
    /// Anzahl der Recent-Tasks, die nach dem Verbindungsaufbau abgefragt werden
    pub recent_anzahl: u32,
    /// Intervall der Status-Abfrage bei aktiver Verbindung (0 = aus)
    pub status_intervall_s: u64,
}

impl Default for WorkerEinstellungen {
    fn default() -> Self {
        Self {
            queue_kapazitaet: 20,
            poll_intervall_ms: 500,
            recent_anzahl: 10,
            status_intervall_s: 10,
        }
    }
}

impl WorkerEinstellungen {
    pub fn poll_intervall(&self) -> Duration {
        Duration::from_millis(self.poll_intervall_ms)
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ClientConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> ClientResult<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt)
                .map_err(|e| ClientError::Konfiguration(format!("Fehler in '{pfad}': {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(ClientError::Konfiguration(format!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            ))),
        }
    }

    /// Parst und validiert eine Konfiguration aus einem TOML-String
    pub fn aus_toml(inhalt: &str) -> ClientResult<Self> {
        let config: Self =
            toml::from_str(inhalt).map_err(|e| ClientError::Konfiguration(e.to_string()))?;
        config.pruefen()?;
        Ok(config)
    }

    /// Prueft Werte, die den Worker blockieren oder Eingaben verwerfen wuerden
    pub fn pruefen(&self) -> ClientResult<()> {
        if self.worker.queue_kapazitaet == 0 {
            return Err(ClientError::Konfiguration(
                "worker.queue_kapazitaet muss groesser als 0 sein".into(),
            ));
        }
        if self.worker.poll_intervall_ms == 0 {
            return Err(ClientError::Konfiguration(
                "worker.poll_intervall_ms muss groesser als 0 sein".into(),
            ));
        }
        if self.verbindung.host.trim().is_empty() {
            return Err(ClientError::Konfiguration("verbindung.host ist leer".into()));
        }
        if !log_level_gueltig(&self.logging.level) {
            return Err(ClientError::Konfiguration(format!(
                "logging.level '{}' ungueltig (trace, debug, info, warn, error)",
                self.logging.level
            )));
        }
        if !log_format_gueltig(&self.logging.format) {
            return Err(ClientError::Konfiguration(format!(
                "logging.format '{}' ungueltig (text, json)",
                self.logging.format
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ClientConfig::default();
        assert!(cfg.pruefen().is_ok());
        assert_eq!(cfg.verbindung.endpunkt(), EndpointConfig::neu("localhost", 5323));
        assert_eq!(cfg.verbindung.discovery_timeout(), Duration::from_secs(3));
        assert_eq!(cfg.verbindung.discovery_timeout(), DISCOVERY_TIMEOUT);
        assert_eq!(cfg.worker.queue_kapazitaet, 20);
        assert_eq!(cfg.worker.poll_intervall(), Duration::from_millis(500));
        assert_eq!(cfg.worker.recent_anzahl, 10);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn discovery_port_folgt_tcp_port() {
        let mut v = VerbindungsEinstellungen::default();
        let ziel = EndpointConfig::neu("charm.local", 6000);
        assert_eq!(v.discovery_port_fuer(&ziel), 6000);

        v.discovery_port = Some(7000);
        assert_eq!(v.discovery_port_fuer(&ziel), 7000);
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [verbindung]
            host = "charm.example"
            port = 6000
            max_backoff_ms = 10000

            [worker]
            recent_anzahl = 3
        "#;
        let cfg = ClientConfig::aus_toml(toml).unwrap();
        assert_eq!(cfg.verbindung.host, "charm.example");
        assert_eq!(cfg.verbindung.port, 6000);
        assert_eq!(cfg.verbindung.max_backoff_ms, Some(10_000));
        assert_eq!(cfg.worker.recent_anzahl, 3);
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.verbindung.backoff_start_ms, 500);
        assert_eq!(cfg.worker.queue_kapazitaet, 20);
    }

    #[test]
    fn ungueltige_queue_kapazitaet() {
        let err = ClientConfig::aus_toml("[worker]\nqueue_kapazitaet = 0\n").unwrap_err();
        assert!(matches!(err, ClientError::Konfiguration(_)));
    }

    #[test]
    fn ungueltige_logging_einstellungen() {
        let err = ClientConfig::aus_toml("[logging]\nlevel = \"verbose\"\n").unwrap_err();
        assert!(matches!(err, ClientError::Konfiguration(_)));

        let err = ClientConfig::aus_toml("[logging]\nformat = \"xml\"\n").unwrap_err();
        assert!(matches!(err, ClientError::Konfiguration(_)));

        let cfg = ClientConfig::aus_toml("[logging]\nlevel = \"debug\"\nformat = \"json\"\n").unwrap();
        assert_eq!(cfg.logging.format, "json");
    }

    #[test]
    fn fehlende_datei_ergibt_standardwerte() {
        let cfg = ClientConfig::laden("/nicht/vorhanden/charm.toml").unwrap();
        assert_eq!(cfg.verbindung.port, STANDARD_PORT);
    }

    #[test]
    fn endpunkt_anzeige() {
        assert_eq!(EndpointConfig::default().to_string(), "localhost:5323");
    }
}
