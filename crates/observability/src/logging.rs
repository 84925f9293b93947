//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `CHARM_LOG_LEVEL`: Filter-Direktive (z.B. `debug` oder
//!   `charm_client=trace,info`), ueberschreibt die Konfiguration
//! - `CHARM_LOG_FORMAT`: `text` oder `json`, ueberschreibt die Konfiguration

use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "CHARM_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "CHARM_LOG_FORMAT";

#[derive(Debug, Error)]
pub enum LoggingFehler {
    #[error("Unbekanntes Log-Format: '{0}' (erlaubt: text, json)")]
    UnbekanntesFormat(String),

    #[error("Logging bereits initialisiert")]
    BereitsInitialisiert,
}

/// Ausgabeformat der Log-Zeilen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingFehler;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            anders => Err(LoggingFehler::UnbekanntesFormat(anders.to_string())),
        }
    }
}

/// Initialisiert das Logging-System.
///
/// `CHARM_LOG_LEVEL` und `CHARM_LOG_FORMAT` haben Vorrang vor den
/// uebergebenen Werten. Eine ungueltige Level-Angabe faellt auf `info`
/// zurueck, ein ungueltiges Format ist ein Fehler.
pub fn logging_initialisieren(level: &str, format: &str) -> Result<(), LoggingFehler> {
    let filter = EnvFilter::try_from_env(ENV_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format: LogFormat = format_waehlen(std::env::var(ENV_LOG_FORMAT).ok(), format).parse()?;

    let ergebnis = match format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).try_init(),
    };
    ergebnis.map_err(|_| LoggingFehler::BereitsInitialisiert)
}

/// Format aus Umgebung, sonst aus Konfiguration
fn format_waehlen(aus_env: Option<String>, konfiguriert: &str) -> String {
    aus_env
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| konfiguriert.to_string())
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    format.parse::<LogFormat>().is_ok()
}
