use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory holding the built SPA; served with an index.html fallback.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            static_dir: default_static_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static/dist")
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Token accepted as a synthetic admin caller, for scripting and setup.
    #[serde(default = "default_admin_token")]
    pub admin_token: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_token: default_admin_token(),
        }
    }
}

fn default_admin_token() -> String {
    // Generate a random token if not provided
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Tax applied to invoice subtotals. The single source of truth for the
    /// rate; nothing else in the system derives it.
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,
    /// Labor rate used when a work order is created without one.
    #[serde(default = "default_labor_rate")]
    pub default_labor_rate: f64,
    #[serde(default = "default_shop_name")]
    pub shop_name: String,
    #[serde(default)]
    pub shop_address: String,
    #[serde(default)]
    pub shop_phone: String,
    #[serde(default)]
    pub shop_email: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            tax_rate: default_tax_rate(),
            default_labor_rate: default_labor_rate(),
            shop_name: default_shop_name(),
            shop_address: String::new(),
            shop_phone: String::new(),
            shop_email: String::new(),
        }
    }
}

fn default_tax_rate() -> f64 {
    0.22
}

fn default_labor_rate() -> f64 {
    75.0
}

fn default_shop_name() -> String {
    "Wrenchr Auto Repair".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| "Failed to parse configuration file")?;
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            billing: BillingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.billing.tax_rate, 0.22);
        assert_eq!(config.billing.default_labor_rate, 75.0);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [billing]
            tax_rate = 0.08
            shop_name = "Eastside Garage"
            "#,
        )
        .unwrap();
        assert_eq!(config.billing.tax_rate, 0.08);
        assert_eq!(config.billing.shop_name, "Eastside Garage");
        // Untouched sections keep their defaults
        assert_eq!(config.server.host, "0.0.0.0");
    }
}
