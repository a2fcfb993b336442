//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `FP_LOG_LEVEL`: Log-Level oder Filter-Direktive, Standard aus der Konfiguration
//! - `FP_LOG_FORMAT`: Format (text/json), Standard aus der Konfiguration
//!
//! Der Chat-Client loggt nach stderr, damit stdout nur die Chat-Ausgabe enthaelt.

use tracing_subscriber::{fmt, EnvFilter};

/// Wohin die Log-Zeilen geschrieben werden
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogZiel {
    Stdout,
    Stderr,
}

/// Initialisiert das Logging-System.
///
/// Liest `FP_LOG_LEVEL` und `FP_LOG_FORMAT` aus der Umgebung.
/// Faellt auf die uebergebenen Werte bzw. `info` / `text` zurueck.
pub fn logging_initialisieren(level: &str, format: &str, ziel: LogZiel) {
    let filter = EnvFilter::try_from_env("FP_LOG_LEVEL")
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format_env = std::env::var("FP_LOG_FORMAT").unwrap_or_else(|_| format.to_string());

    match (format_env.as_str(), ziel) {
        ("json", LogZiel::Stdout) => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_current_span(true)
                .init();
        }
        ("json", LogZiel::Stderr) => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_current_span(true)
                .with_writer(std::io::stderr)
                .init();
        }
        (_, LogZiel::Stdout) => {
            fmt().with_env_filter(filter).with_target(true).init();
        }
        (_, LogZiel::Stderr) => {
            fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_gueltige_werte() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(log_level_gueltig(level));
        }
    }

    #[test]
    fn log_level_ungueltige_werte() {
        assert!(!log_level_gueltig("verbose"));
        assert!(!log_level_gueltig("INFO")); // Gross-/Kleinschreibung
        assert!(!log_level_gueltig(""));
    }

    #[test]
    fn log_format_werte() {
        assert!(log_format_gueltig("text"));
        assert!(log_format_gueltig("json"));
        assert!(!log_format_gueltig("xml"));
        assert!(!log_format_gueltig("JSON"));
    }
}
