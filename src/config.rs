// =============================================================================
// config.rs — THE CONFIGURATION CLOSET
// =============================================================================
//
// Nowhere near a cathedral. The keyword lists are compiled in and stay that
// way; what remains tunable is where the HTTP form listens, how much it is
// willing to read, what the downloads are called, and how the logs look.
//
// All values can be overridden via environment variables prefixed with
// AD_RISK_. A .env file in the working directory is honoured too.
// =============================================================================

use std::env;

use crate::batch::DEFAULT_CSV_FILENAME;
use crate::report::DEFAULT_REPORT_FILENAME;

#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // HTTP SERVICE
    // =========================================================================

    /// Address the HTTP form service binds to.
    /// Default: 127.0.0.1 (local only; set 0.0.0.0 to expose it)
    pub bind_addr: String,

    /// Port for the HTTP form service.
    /// Default: 8501
    pub port: u16,

    /// Largest request body the service will read, in bytes.
    /// Default: 10 MiB. Plenty for a CSV of ad copy.
    pub max_body_bytes: usize,

    // =========================================================================
    // DOWNLOADS
    // =========================================================================

    /// Filename offered for the PDF report. Default: risk_analysis.pdf
    pub report_filename: String,

    /// Filename offered for the CSV export. Default: risk_result.csv
    pub csv_filename: String,

    // =========================================================================
    // LOGGING
    // =========================================================================

    /// Emit logs as JSON lines instead of human-readable text.
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        // Not everyone has a .env file, and that's fine.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. `from_env` passes the process
    /// environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Config {
            bind_addr: get("AD_RISK_BIND_ADDR", "127.0.0.1"),
            port: get("AD_RISK_PORT", "8501").parse().unwrap_or(8501),
            max_body_bytes: get("AD_RISK_MAX_BODY_BYTES", "10485760")
                .parse()
                .unwrap_or(10 * 1024 * 1024),
            report_filename: get("AD_RISK_REPORT_FILENAME", DEFAULT_REPORT_FILENAME),
            csv_filename: get("AD_RISK_CSV_FILENAME", DEFAULT_CSV_FILENAME),
            log_json: parse_bool(&get("AD_RISK_LOG_JSON", "false")),
        }
    }

    /// `bind_addr:port`, ready for `TcpListener::bind`.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
