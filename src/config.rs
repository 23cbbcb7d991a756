//! Configuration for the tombola service
//!
//! Defaults, TOML file loading, `TOMBOLA_*` environment overrides, and
//! validation of the final values.

use crate::errors::ConfigError;
use crate::raffle::Amount;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub raffle: RaffleSettings,
    pub oracle: OracleSettings,
    pub automation: AutomationSettings,
    pub api: ApiSettings,
    pub storage: StorageSettings,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RaffleSettings {
    /// Entrance fee in base units (lamports).
    pub entrance_fee: Amount,
    /// Minimum time between round closures, in seconds.
    pub interval_secs: u64,
}

impl Default for RaffleSettings {
    fn default() -> Self {
        Self {
            entrance_fee: 10_000_000, // 0.01 SOL
            interval_secs: 30,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSettings {
    /// Label of the oracle endpoint in use.
    pub endpoint: String,
    pub callback_gas_limit: u32,
    pub num_words: u32,
    /// Simulated oracle latency before the callback is delivered.
    pub fulfillment_delay_ms: u64,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            endpoint: "vrf-local".to_string(),
            callback_gas_limit: 500_000,
            num_words: 1,
            fulfillment_delay_ms: 500,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationSettings {
    /// How often the keeper re-evaluates the upkeep predicate.
    pub poll_interval_ms: u64,
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub data_dir: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: "./tombola_data".to_string(),
        }
    }
}

/// Loads configuration from an optional TOML file plus the environment.
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = if let Some(ref path) = self.config_path {
            self.load_from_file(path)?
        } else {
            AppConfig::default()
        };

        self.apply_env_overrides(&mut config)?;
        self.validate(&config)?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> Result<AppConfig, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("failed to read {path}: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::LoadFailed(format!("failed to parse TOML: {e}")))
    }

    fn apply_env_overrides(&self, config: &mut AppConfig) -> Result<(), ConfigError> {
        if let Ok(fee) = env::var("TOMBOLA_ENTRANCE_FEE") {
            config.raffle.entrance_fee = parse_env("TOMBOLA_ENTRANCE_FEE", &fee)?;
        }
        if let Ok(interval) = env::var("TOMBOLA_INTERVAL_SECS") {
            config.raffle.interval_secs = parse_env("TOMBOLA_INTERVAL_SECS", &interval)?;
        }
        if let Ok(delay) = env::var("TOMBOLA_FULFILLMENT_DELAY_MS") {
            config.oracle.fulfillment_delay_ms = parse_env("TOMBOLA_FULFILLMENT_DELAY_MS", &delay)?;
        }
        if let Ok(poll) = env::var("TOMBOLA_POLL_INTERVAL_MS") {
            config.automation.poll_interval_ms = parse_env("TOMBOLA_POLL_INTERVAL_MS", &poll)?;
        }
        if let Ok(host) = env::var("TOMBOLA_API_HOST") {
            config.api.host = host;
        }
        if let Ok(port) = env::var("TOMBOLA_API_PORT") {
            config.api.port = parse_env("TOMBOLA_API_PORT", &port)?;
        }
        if let Ok(data_dir) = env::var("TOMBOLA_DATA_DIR") {
            config.storage.data_dir = data_dir;
        }
        Ok(())
    }

    fn validate(&self, config: &AppConfig) -> Result<(), ConfigError> {
        if config.raffle.entrance_fee == 0 {
            return Err(ConfigError::InvalidValue {
                field: "raffle.entrance_fee".to_string(),
                value: "0".to_string(),
                reason: "entrance fee must be positive".to_string(),
            });
        }
        if config.raffle.interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "raffle.interval_secs".to_string(),
                value: "0".to_string(),
                reason: "interval must be positive".to_string(),
            });
        }
        if config.oracle.num_words == 0 {
            return Err(ConfigError::InvalidValue {
                field: "oracle.num_words".to_string(),
                value: "0".to_string(),
                reason: "at least one random word is required".to_string(),
            });
        }
        if config.automation.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "automation.poll_interval_ms".to_string(),
                value: "0".to_string(),
                reason: "poll interval must be positive".to_string(),
            });
        }
        if config.api.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "api.port".to_string(),
                value: "0".to_string(),
                reason: "port cannot be zero".to_string(),
            });
        }
        if config.storage.data_dir.is_empty() {
            return Err(ConfigError::MissingRequired("storage.data_dir".to_string()));
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_env<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: "could not be parsed".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_are_valid() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config.raffle.entrance_fee, 10_000_000);
        assert_eq!(config.raffle.interval_secs, 30);
        assert_eq!(config.oracle.num_words, 1);
        assert_eq!(config.api.port, 8080);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[raffle]\nentrance_fee = 42\n\n[api]\nport = 9000"
        )
        .unwrap();

        let config = ConfigLoader::new().with_path(file.path()).load().unwrap();
        assert_eq!(config.raffle.entrance_fee, 42);
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.raffle.interval_secs, 30);
        assert_eq!(config.oracle.fulfillment_delay_ms, 500);
    }

    #[test]
    fn zero_fee_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[raffle]\nentrance_fee = 0").unwrap();

        let err = ConfigLoader::new()
            .with_path(file.path())
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("raffle.entrance_fee"));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[raffle]\ninterval_secs = 0").unwrap();

        assert!(ConfigLoader::new().with_path(file.path()).load().is_err());
    }

    #[test]
    fn missing_file_reports_load_failure() {
        let err = ConfigLoader::new()
            .with_path("/nonexistent/tombola.toml")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::LoadFailed(_)));
    }
}
