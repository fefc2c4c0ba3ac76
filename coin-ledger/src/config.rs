//! Configuration for the ledger and the service wrapping it

use crate::types::AccountName;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming a TOML config file
pub const CONFIG_PATH_ENV: &str = "BILLING_CONFIG";

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// gRPC listen address
    pub grpc_listen_addr: String,

    /// Emission limits
    pub emission: EmissionConfig,

    /// Accounts created at startup, in enumeration order
    pub population: Vec<AccountSeed>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "billing-service".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            grpc_listen_addr: "0.0.0.0:50051".to_string(),
            emission: EmissionConfig::default(),
            population: vec![
                AccountSeed::new("boris", 5000),
                AccountSeed::new("maria", 1000),
                AccountSeed::new("oleg", 800),
            ],
        }
    }
}

/// Emission configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionConfig {
    /// Largest amount a single emission may request
    pub max_amount: u64,
}

impl Default for EmissionConfig {
    fn default() -> Self {
        Self {
            max_amount: 1_000_000,
        }
    }
}

/// Account created at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSeed {
    /// Unique account name
    pub name: AccountName,

    /// Reputation score
    pub reputation: u64,
}

impl AccountSeed {
    /// Create new seed
    pub fn new(name: impl Into<String>, reputation: u64) -> Self {
        Self {
            name: AccountName::new(name),
            reputation,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML string
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(addr) = std::env::var("BILLING_GRPC_ADDR") {
            config.grpc_listen_addr = addr;
        }

        if let Ok(max) = std::env::var("BILLING_MAX_EMISSION") {
            config.emission.max_amount = max.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid BILLING_MAX_EMISSION {:?}: {}", max, e))
            })?;
        }

        Ok(config)
    }

    /// Load from the file named by `BILLING_CONFIG`, or from the environment
    pub fn load() -> crate::Result<Self> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => {
                tracing::info!("Loading configuration from {}", path);
                Self::from_file(path)
            }
            Err(_) => Self::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "billing-service");
        assert_eq!(config.grpc_listen_addr, "0.0.0.0:50051");
        assert_eq!(config.emission.max_amount, 1_000_000);
        assert_eq!(config.population.len(), 3);
        assert_eq!(config.population[0], AccountSeed::new("boris", 5000));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            grpc_listen_addr = "127.0.0.1:6000"

            [[population]]
            name = "alice"
            reputation = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.grpc_listen_addr, "127.0.0.1:6000");
        assert_eq!(config.emission.max_amount, 1_000_000);
        assert_eq!(config.population, vec![AccountSeed::new("alice", 10)]);
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_toml("population = 3").unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_example_config_parses() {
        let config =
            Config::from_toml(include_str!("../../config/billing.example.toml")).unwrap();
        assert_eq!(config.population.len(), 3);
        assert_eq!(config.emission.max_amount, 1_000_000);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[emission]\nmax_amount = 42\n\n[[population]]\nname = \"x\"\nreputation = 1"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.emission.max_amount, 42);
        assert_eq!(config.population[0].name.as_str(), "x");
    }
}
