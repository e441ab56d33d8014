//! Configuration module for UpTrail.
//!
//! Process settings come from environment variables with sensible defaults.
//! Monitors and display settings come from a YAML file.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Cycle interval used when neither the settings nor any monitor provide one.
pub const DEFAULT_INTERVAL_MS: u64 = 30_000;

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address for the web server (default: "0.0.0.0")
    pub http_host: String,
    /// HTTP port for the web server (default: 8182)
    pub http_port: u16,
    /// Path to the SQLite database file (default: "status.db")
    pub db_path: String,
    /// Path to the YAML monitor configuration (default: "config.yaml")
    pub config_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_host: "0.0.0.0".to_string(),
            http_port: 8182,
            db_path: "status.db".to_string(),
            config_path: "config.yaml".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `UPTRAIL_HTTP_HOST`: bind address (default: "0.0.0.0")
    /// - `UPTRAIL_HTTP_PORT`: HTTP port (default: 8182)
    /// - `UPTRAIL_DB_PATH`: Database file path (default: "status.db")
    /// - `UPTRAIL_CONFIG_PATH`: YAML config path (default: "config.yaml")
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Ok(host) = env::var("UPTRAIL_HTTP_HOST") {
            cfg.http_host = host;
        }

        if let Ok(port_str) = env::var("UPTRAIL_HTTP_PORT") {
            if let Ok(port) = port_str.parse() {
                cfg.http_port = port;
            }
        }

        if let Ok(db_path) = env::var("UPTRAIL_DB_PATH") {
            cfg.db_path = db_path;
        }

        if let Ok(config_path) = env::var("UPTRAIL_CONFIG_PATH") {
            cfg.config_path = config_path;
        }

        cfg
    }

    /// Apply the `server` section of the YAML file on top of the env values.
    pub fn merge(&mut self, section: &ServerSection) {
        if let Some(host) = &section.host {
            self.http_host = host.clone();
        }
        if let Some(port) = section.port {
            self.http_port = port;
        }
    }
}

/// Discord-compatible webhook settings for a monitor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscordIntegration {
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// A configured HTTP endpoint to check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorTarget {
    pub name: String,
    pub url: String,
    /// Declared check interval in milliseconds. Only the cycle interval is
    /// honoured by the scheduler, see [`AppConfig::cycle_interval`].
    #[serde(rename = "interval", default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_accepted_codes")]
    pub accepted_status_codes: HashSet<u16>,
    #[serde(rename = "verify", default = "default_true")]
    pub verify_tls: bool,
    #[serde(default)]
    pub discord_integration: Option<DiscordIntegration>,
}

impl MonitorTarget {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            interval_ms: DEFAULT_INTERVAL_MS,
            accepted_status_codes: default_accepted_codes(),
            verify_tls: true,
            discord_integration: None,
        }
    }

    /// Webhook URL, if one is configured and non-empty.
    pub fn webhook_url(&self) -> Option<&str> {
        self.discord_integration
            .as_ref()
            .and_then(|d| d.webhook_url.as_deref())
            .filter(|url| !url.is_empty())
    }

    pub fn accepts(&self, status_code: u16) -> bool {
        self.accepted_status_codes.contains(&status_code)
    }
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

fn default_accepted_codes() -> HashSet<u16> {
    HashSet::from([200])
}

fn default_true() -> bool {
    true
}

/// Display and aggregation settings (the `configuration` section).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub site_title: Option<String>,
    #[serde(default)]
    pub footer_text: Option<String>,
    /// Absolute number of down checks that marks a bucket degraded.
    #[serde(default)]
    pub degraded_threshold: Option<u32>,
    /// Failure fraction (0..1) that marks a bucket degraded.
    #[serde(default)]
    pub degraded_percentage_threshold: Option<f64>,
    /// Explicit cycle interval in milliseconds shared by every monitor.
    #[serde(default)]
    pub check_interval: Option<u64>,
}

/// The `server` section of the YAML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

/// Parsed YAML configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub monitors: Vec<MonitorTarget>,
    #[serde(default)]
    pub configuration: AppSettings,
    #[serde(default)]
    pub server: ServerSection,
}

impl AppConfig {
    /// Read and validate the YAML file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let cfg: AppConfig = serde_yml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for monitor in &self.monitors {
            if monitor.name.trim().is_empty() {
                return Err(ConfigError::Invalid("monitor name cannot be empty".to_string()));
            }
            if !seen.insert(monitor.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate monitor name: {}",
                    monitor.name
                )));
            }
            if monitor.interval_ms == 0 {
                return Err(ConfigError::Invalid(format!(
                    "interval for monitor {} must be positive",
                    monitor.name
                )));
            }
        }

        if self.configuration.check_interval == Some(0) {
            return Err(ConfigError::Invalid("check_interval must be positive".to_string()));
        }

        if let Some(pct) = self.configuration.degraded_percentage_threshold {
            if !(0.0..=1.0).contains(&pct) {
                return Err(ConfigError::Invalid(format!(
                    "degraded_percentage_threshold must be between 0 and 1, got {}",
                    pct
                )));
            }
        }

        Ok(())
    }

    /// The single interval that paces every check cycle.
    ///
    /// Resolves as `configuration.check_interval`, then the first monitor's
    /// interval, then [`DEFAULT_INTERVAL_MS`]. Per-monitor intervals would need
    /// one loop per monitor and are not honoured.
    pub fn cycle_interval(&self) -> Duration {
        let ms = self
            .configuration
            .check_interval
            .or_else(|| self.monitors.first().map(|m| m.interval_ms))
            .unwrap_or(DEFAULT_INTERVAL_MS);

        if self.monitors.iter().any(|m| m.interval_ms != ms) {
            tracing::warn!(
                "Monitors declare differing intervals; all are checked every {}ms",
                ms
            );
        }

        Duration::from_millis(ms)
    }
}
