use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

use crate::token::TokenKind;

/// Overrides `postgres_url`
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
/// Overrides `token.symmetric_key`
pub const ENV_TOKEN_SYMMETRIC_KEY: &str = "TOKEN_SYMMETRIC_KEY";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    pub postgres_url: String,
    #[serde(default = "default_max_connections")]
    pub postgres_max_connections: u32,
    pub token: TokenConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
}

fn default_max_connections() -> u32 {
    20
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenConfig {
    /// `paseto` (default) or `jwt`
    #[serde(default)]
    pub maker: TokenKind,
    pub symmetric_key: String,
    pub access_token_duration_secs: u64,
    pub refresh_token_duration_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransferConfig {
    /// Per-transfer deadline; 0 disables it
    pub timeout_ms: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

impl TransferConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

impl AppConfig {
    /// Load `config/{env}.yaml`, then apply environment overrides
    pub fn load(env: &str) -> Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse config yaml")
    }

    /// Replace secrets and connection strings from `lookup` when set
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_DATABASE_URL).filter(|v| !v.is_empty()) {
            self.postgres_url = url;
        }
        if let Some(key) = lookup(ENV_TOKEN_SYMMETRIC_KEY).filter(|v| !v.is_empty()) {
            self.token.symmetric_key = key;
        }
    }
}
