//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the ticketing backend API
    pub base_url: String,
    #[serde(default = "default_api_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_api_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
pub struct KioskConfig {
    /// Origin embedded in the registration URL the QR encodes
    pub public_origin: String,
    /// Session status poll cadence while a QR is on screen
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Cosmetic delay before flipping a fresh QR onto the screen
    #[serde(default = "default_qr_reveal_delay_ms")]
    pub qr_reveal_delay_ms: u64,
    /// How long the success confirmation stays on screen
    #[serde(default = "default_confirm_dwell_ms")]
    pub confirm_dwell_ms: u64,
    /// Pause between confirmation and requesting the next session
    #[serde(default = "default_transition_delay_ms")]
    pub transition_delay_ms: u64,
    /// Delay before the daemon retries after a failed session cycle
    #[serde(default = "default_error_retry_ms")]
    pub error_retry_ms: u64,
    /// Grace period past expires_at before an unclaimed session is abandoned
    #[serde(default = "default_expiry_grace_secs")]
    pub expiry_grace_secs: u64,
}

fn default_poll_interval_ms() -> u64 {
    1500
}

fn default_qr_reveal_delay_ms() -> u64 {
    100
}

fn default_confirm_dwell_ms() -> u64 {
    3000
}

fn default_transition_delay_ms() -> u64 {
    500
}

fn default_error_retry_ms() -> u64 {
    5000
}

fn default_expiry_grace_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval_secs")]
    pub interval_secs: u64,
}

fn default_metrics_interval_secs() -> u64 {
    30
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval_secs() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    pub api: ApiConfig,
    pub kiosk: KioskConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    api_base_url: String,
    api_timeout_ms: u64,
    public_origin: String,
    poll_interval_ms: u64,
    qr_reveal_delay_ms: u64,
    confirm_dwell_ms: u64,
    transition_delay_ms: u64,
    error_retry_ms: u64,
    expiry_grace_secs: u64,
    metrics_interval_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:4000/api".to_string(),
            api_timeout_ms: default_api_timeout_ms(),
            public_origin: "http://localhost:3000".to_string(),
            poll_interval_ms: default_poll_interval_ms(),
            qr_reveal_delay_ms: default_qr_reveal_delay_ms(),
            confirm_dwell_ms: default_confirm_dwell_ms(),
            transition_delay_ms: default_transition_delay_ms(),
            error_retry_ms: default_error_retry_ms(),
            expiry_grace_secs: default_expiry_grace_secs(),
            metrics_interval_secs: default_metrics_interval_secs(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self {
            api_base_url: toml_config.api.base_url,
            api_timeout_ms: toml_config.api.timeout_ms,
            public_origin: toml_config.kiosk.public_origin,
            poll_interval_ms: toml_config.kiosk.poll_interval_ms,
            qr_reveal_delay_ms: toml_config.kiosk.qr_reveal_delay_ms,
            confirm_dwell_ms: toml_config.kiosk.confirm_dwell_ms,
            transition_delay_ms: toml_config.kiosk.transition_delay_ms,
            error_retry_ms: toml_config.kiosk.error_retry_ms,
            expiry_grace_secs: toml_config.kiosk.expiry_grace_secs,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_ms)
    }

    pub fn public_origin(&self) -> &str {
        &self.public_origin
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn qr_reveal_delay(&self) -> Duration {
        Duration::from_millis(self.qr_reveal_delay_ms)
    }

    pub fn confirm_dwell(&self) -> Duration {
        Duration::from_millis(self.confirm_dwell_ms)
    }

    pub fn transition_delay(&self) -> Duration {
        Duration::from_millis(self.transition_delay_ms)
    }

    pub fn error_retry(&self) -> Duration {
        Duration::from_millis(self.error_retry_ms)
    }

    pub fn expiry_grace(&self) -> Duration {
        Duration::from_secs(self.expiry_grace_secs)
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}
