//! sg-updater configuration loading and parsing

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "/etc/sg-updater/config.toml";

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct UpdaterConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tags: TagConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Tag keys read from each security group
#[derive(Debug, Deserialize, Clone)]
pub struct TagConfig {
    #[serde(default = "default_enabled_tag")]
    pub enabled: String,
    #[serde(default = "default_dns_name_tag")]
    pub dns_name: String,
    #[serde(default = "default_ports_tag")]
    pub ports: String,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_tag(),
            dns_name: default_dns_name_tag(),
            ports: default_ports_tag(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_api_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            token_env: default_token_env(),
            timeout_seconds: default_api_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct ScheduleConfig {
    /// Seconds between cycles; 0 runs a single cycle and exits
    #[serde(default)]
    pub interval_seconds: u64,
}

// Default value functions
fn default_log_level() -> String { "info".into() }
fn default_enabled_tag() -> String { "SecurityGroupUpdater_Enabled".into() }
fn default_dns_name_tag() -> String { "SecurityGroupUpdater_IngressDNSName".into() }
fn default_ports_tag() -> String { "SecurityGroupUpdater_IngressPorts".into() }
fn default_api_base_url() -> String { "http://127.0.0.1:8787".into() }
fn default_token_env() -> String { "SG_UPDATER_API_TOKEN".into() }
fn default_api_timeout() -> u64 { 30 }

/// Config location: SG_UPDATER_CONFIG or /etc/sg-updater/config.toml
pub fn config_path() -> PathBuf {
    std::env::var("SG_UPDATER_CONFIG")
        .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
        .into()
}

/// Load configuration, falling back to defaults when the file is absent
pub fn load_config_from(config_path: &Path) -> Result<UpdaterConfig> {
    if config_path.exists() {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
        let config: UpdaterConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;
        Ok(config)
    } else {
        Ok(UpdaterConfig::default())
    }
}
