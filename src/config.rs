//! Application configuration loaded from environment variables.
//!
//! Every value has a local-development default so the control plane starts
//! with zero setup. The config is read once at startup and passed down by
//! explicit injection; there is no global.

use std::path::PathBuf;
use std::time::Duration;

use crate::errors::CorvusError;

/// Runtime configuration for the control plane.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// TCP port the HTTP server listens on.
    pub port: u16,

    /// Path to the SQLite database file.
    pub db_path: PathBuf,

    /// Base directory for published static files. Each deployment owns
    /// `<asset_root>/<slug>/`, bind-mounted into its serving container.
    pub asset_root: PathBuf,

    /// Base directory for per-deployment log files (`<log_root>/<slug>.log`).
    pub log_root: PathBuf,

    /// Docker network shared by Traefik and every serving container.
    pub traefik_network: String,

    /// Domain suffix for deployment URLs (`http://<slug>.<base_domain>`).
    pub base_domain: String,

    /// Log output format: "text" or "json".
    pub log_format: LogFormat,

    /// How often the expiration reaper scans for expired deployments.
    pub reap_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl AppConfig {
    /// Load configuration from the process environment, falling back to
    /// local-development defaults for anything unset.
    pub fn from_env() -> Result<Self, CorvusError> {
        let port = env_or("PORT", "8080")
            .parse::<u16>()
            .map_err(|e| CorvusError::Config(format!("invalid PORT: {e}")))?;

        let reap_secs = env_or("REAP_INTERVAL_SECS", "30")
            .parse::<u64>()
            .map_err(|e| CorvusError::Config(format!("invalid REAP_INTERVAL_SECS: {e}")))?;

        let log_format = match env_or("LOG_FORMAT", "text").as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            port,
            db_path: PathBuf::from(env_or("DB_PATH", "./corvus.db")),
            asset_root: PathBuf::from(env_or("SERVE_ROOT", "./data/deployments")),
            log_root: PathBuf::from(env_or("LOG_ROOT", "./data/logs")),
            traefik_network: env_or("TRAEFIK_NETWORK", "corvus-paas-network"),
            base_domain: env_or("BASE_DOMAIN", "localhost"),
            log_format,
            reap_interval: Duration::from_secs(reap_secs),
        })
    }
}

fn env_or(key: &str, fallback: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_env_unset() {
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.traefik_network, "corvus-paas-network");
        assert_eq!(config.base_domain, "localhost");
        assert_eq!(config.reap_interval, Duration::from_secs(30));
    }
}
