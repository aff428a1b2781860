//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. RAIL_CONFIG environment variable
//! 3. Default: config/dev.toml

use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { name: default_service_name() }
    }
}

fn default_service_name() -> String {
    "rail-tickets".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FaresConfig {
    /// Fixed seed for reproducible fares; entropy-seeded when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// Capacity of each channel observer's queue
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer: usize,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { channel_buffer: default_channel_buffer() }
    }
}

fn default_channel_buffer() -> usize {
    256
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_log_summary")]
    pub log_summary: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { log_summary: default_log_summary() }
    }
}

fn default_log_summary() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub fares: FaresConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    service_name: String,
    fare_seed: Option<u64>,
    channel_buffer: usize,
    log_metrics_summary: bool,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            fare_seed: None,
            channel_buffer: default_channel_buffer(),
            log_metrics_summary: default_log_summary(),
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

        if let Ok(path) = env::var("RAIL_CONFIG") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(Self { config_file: path.display().to_string(), ..config })
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let toml_config: TomlConfig = toml::from_str(content)?;

        if toml_config.notifications.channel_buffer == 0 {
            anyhow::bail!("notifications.channel_buffer must be at least 1");
        }

        Ok(Self {
            service_name: toml_config.service.name,
            fare_seed: toml_config.fares.seed,
            channel_buffer: toml_config.notifications.channel_buffer,
            log_metrics_summary: toml_config.metrics.log_summary,
            config_file: "inline".to_string(),
        })
    }

    /// Load configuration from a specific path, falling back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "config_fallback_to_defaults");
                Self::default()
            }
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn fare_seed(&self) -> Option<u64> {
        self.fare_seed
    }

    pub fn channel_buffer(&self) -> usize {
        self.channel_buffer
    }

    pub fn log_metrics_summary(&self) -> bool {
        self.log_metrics_summary
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Override the fare seed (e.g. from a command line flag)
    pub fn with_fare_seed(mut self, seed: u64) -> Self {
        self.fare_seed = Some(seed);
        self
    }
}
