// common/src/config.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use config::{Config as ConfigFile, File, Environment};

use crate::challenge::DEFAULT_APP_NAME;

pub const DEFAULT_TELEMETRY_ENDPOINT: &str = "https://analytics.walletconnect.com/events";

/// Problems found while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("project_id is not defined")]
    MissingProjectId,

    #[error("invalid telemetry endpoint {endpoint}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
}

/// Central configuration for the session server
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_addr: String,
    /// Project identifier reported with every telemetry event
    pub project_id: String,
    /// Application name shown in the challenge text
    pub app_name: String,
    /// Domain used when the browser does not report its hostname
    pub domain: String,
    /// Hostnames the telemetry project is configured for
    pub allowed_domains: Vec<String>,

    pub telemetry: TelemetryConfig,
    pub bridge: BridgeConfig,
    pub static_files: StaticFilesConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub timeout_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// How long a wallet prompt may stay open
    pub sign_timeout_secs: u64,
    /// How long a registry tracking call may take in the browser
    pub track_timeout_secs: u64,
    pub heartbeat_interval_secs: u64,
    pub client_timeout_secs: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub path: String,
    pub index: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:8081".to_string(),
            project_id: String::new(),
            app_name: DEFAULT_APP_NAME.to_string(),
            domain: "localhost".to_string(),
            allowed_domains: vec![
                "educational-sandbox.vercel.app".to_string(),
                "localhost".to_string(),
            ],
            telemetry: TelemetryConfig::default(),
            bridge: BridgeConfig::default(),
            static_files: StaticFilesConfig::default(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_TELEMETRY_ENDPOINT.to_string(),
            timeout_ms: 5000,
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            sign_timeout_secs: 300,
            track_timeout_secs: 5,
            heartbeat_interval_secs: 5,
            client_timeout_secs: 30,
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            path: "./static".to_string(),
            index: "index.html".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, ConfigError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        // Locate the config directory
        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        let config: Config = ConfigFile::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Environment variables with prefix "APP", e.g. APP__TELEMETRY__ENDPOINT
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load from files, then apply plain environment variables on top
    pub fn from_env() -> Self {
        let mut config = match Self::load() {
            Ok(config) => {
                tracing::info!("Configuration loaded from files and environment");
                config
            },
            Err(e) => {
                tracing::warn!("Failed to load configuration from files: {}", e);
                tracing::info!("Falling back to environment variables only");
                Self::default()
            }
        };

        config.apply_overrides(|key| env::var(key).ok());
        config
    }

    /// Override fields from unprefixed variables such as `PROJECT_ID`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SERVER_ADDR") {
            self.server_addr = v;
        }
        if let Some(v) = lookup("PROJECT_ID") {
            self.project_id = v;
        }
        if let Some(v) = lookup("APP_NAME") {
            self.app_name = v;
        }
        if let Some(v) = lookup("DOMAIN") {
            self.domain = v;
        }
        if let Some(v) = lookup("ALLOWED_DOMAINS") {
            self.allowed_domains = v
                .split(',')
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .collect();
        }

        if let Some(v) = lookup("TELEMETRY_ENABLED") {
            self.telemetry.enabled = v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = lookup("TELEMETRY_ENDPOINT") {
            self.telemetry.endpoint = v;
        }
        match lookup("TELEMETRY_TIMEOUT_MS").map(|v| v.parse::<u64>()) {
            Some(Ok(ms)) => self.telemetry.timeout_ms = ms,
            Some(Err(e)) => tracing::warn!("Ignoring TELEMETRY_TIMEOUT_MS: {}", e),
            None => {},
        }

        if let Some(v) = lookup("STATIC_FILES_PATH") {
            self.static_files.path = v;
        }
        if let Some(v) = lookup("STATIC_FILES_INDEX") {
            self.static_files.index = v;
        }
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project_id.trim().is_empty() {
            return Err(ConfigError::MissingProjectId);
        }

        if self.telemetry.enabled {
            url::Url::parse(&self.telemetry.endpoint).map_err(|source| ConfigError::InvalidEndpoint {
                endpoint: self.telemetry.endpoint.clone(),
                source,
            })?;
        }

        Ok(())
    }

    pub fn is_allowed_domain(&self, domain: &str) -> bool {
        self.allowed_domains.iter().any(|d| d.eq_ignore_ascii_case(domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_project_id_is_rejected() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(ConfigError::MissingProjectId)));
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let mut config = Config {
            project_id: "abc123".to_string(),
            ..Config::default()
        };
        config.telemetry.endpoint = "not a url".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidEndpoint { .. })));

        // Endpoint is irrelevant once telemetry is off
        config.telemetry.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_allowed_domain_lookup() {
        let config = Config::default();
        assert!(config.is_allowed_domain("localhost"));
        assert!(config.is_allowed_domain("Educational-Sandbox.vercel.app"));
        assert!(!config.is_allowed_domain("example.org"));
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let vars: HashMap<&str, &str> = [
            ("PROJECT_ID", "abc123"),
            ("ALLOWED_DOMAINS", "a.example, b.example,"),
            ("TELEMETRY_ENABLED", "FALSE"),
            ("TELEMETRY_TIMEOUT_MS", "soon"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.project_id, "abc123");
        assert_eq!(config.allowed_domains, vec!["a.example", "b.example"]);
        assert!(!config.telemetry.enabled);
        // Unparseable values keep the previous setting
        assert_eq!(config.telemetry.timeout_ms, 5000);
        assert_eq!(config.server_addr, "127.0.0.1:8081");
    }

    #[test]
    fn test_plain_env_applies_without_config_files() {
        let empty_dir = env::temp_dir().join(format!("session-config-{}", std::process::id()));
        std::fs::create_dir_all(&empty_dir).unwrap();

        env::set_var("CONFIG_DIR", &empty_dir);
        env::set_var("PROJECT_ID", "abc123");
        env::set_var("SERVER_ADDR", "0.0.0.0:9999");

        let config = Config::from_env();

        env::remove_var("CONFIG_DIR");
        env::remove_var("PROJECT_ID");
        env::remove_var("SERVER_ADDR");
        let _ = std::fs::remove_dir(&empty_dir);

        assert_eq!(config.project_id, "abc123");
        assert_eq!(config.server_addr, "0.0.0.0:9999");
        assert!(config.validate().is_ok());
    }
}
