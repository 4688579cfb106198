//! Configuration management for the firehose driver
//!
//! Loads configuration from TOML files with environment variable substitution.
//! Every section except `[chain]` has defaults, so a minimal file only needs
//! the chain id and RPC URLs. Private key material is never part of the file;
//! `[wallet]` only names the environment variable that holds it.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub chain: ChainConfig,
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub gas: GasConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub rpc_urls: Vec<String>,
    /// Recipient of the self-transfers; defaults to the sender's own address.
    #[serde(default)]
    pub recipient: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Transactions per round.
    pub batch_size: usize,
    /// Concurrent submissions; 0 means one per available core.
    pub workers: usize,
    /// Iteration ceiling, effectively infinite at the default.
    pub max_rounds: u64,
    /// Pause after a completed round.
    pub round_delay_ms: u64,
    /// Pause after a transport fault.
    pub fault_delay_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            workers: 0,
            max_rounds: 150_000_000,
            round_delay_ms: 1000,
            fault_delay_ms: 4000,
        }
    }
}

impl DriverConfig {
    /// Effective worker count; `workers = 0` resolves to the number of
    /// available cores.
    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            self.workers
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GasConfig {
    /// Factor chain applied to the network gas price to seed the floor.
    pub initial_factors: Vec<f64>,
    /// Per-offset premium step in wei.
    pub step_wei: u64,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            initial_factors: vec![
                1.5, 1.5, 1.1, 1.2, 1.1, 1.15, 1.15, 1.15, 1.15, 1.15, 1.1, 1.1, 1.1,
            ],
            step_wei: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9090,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Name of the environment variable holding the hex private key.
    pub private_key_env: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            private_key_env: "FIREHOSE_PRIVATE_KEY".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from configuration files
    pub fn load() -> Result<Self> {
        let config_path = env::var("FIREHOSE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::parse(&config_str)
    }

    /// Parse settings from a TOML string with env substitution
    pub fn parse(config_str: &str) -> Result<Self> {
        let config_str = substitute_env_vars(config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.chain.rpc_urls.is_empty() {
            anyhow::bail!("At least one RPC URL must be configured");
        }

        if self.driver.batch_size == 0 {
            anyhow::bail!("batch_size must be positive");
        }

        if self.gas.initial_factors.iter().any(|f| *f <= 0.0) {
            anyhow::bail!("gas.initial_factors must all be positive");
        }

        Ok(())
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_env_var_substitution() {
        env::set_var("TEST_VAR", "test_value");
        let input = "url = \"https://api.example.com/${TEST_VAR}/endpoint\"";
        let result = substitute_env_vars(input);
        assert_eq!(result, "url = \"https://api.example.com/test_value/endpoint\"");
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let settings = Settings::parse(
            r#"
            [chain]
            chain_id = 245022926
            rpc_urls = ["https://rpc.example.org"]
            "#,
        )
        .unwrap();

        assert_eq!(settings.driver.batch_size, 1000);
        assert_eq!(settings.driver.round_delay_ms, 1000);
        assert_eq!(settings.driver.fault_delay_ms, 4000);
        assert_eq!(settings.gas.step_wei, 100);
        assert!(!settings.gas.initial_factors.is_empty());
        assert_eq!(settings.wallet.private_key_env, "FIREHOSE_PRIVATE_KEY");
        assert!(settings.driver.worker_count() >= 1);
    }

    #[test]
    fn empty_rpc_urls_rejected() {
        let result = Settings::parse(
            r#"
            [chain]
            chain_id = 1
            rpc_urls = []
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn load_reads_file_from_env_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [chain]
            chain_id = 1
            rpc_urls = ["https://rpc.example.org"]

            [driver]
            batch_size = 3
            "#
        )
        .unwrap();

        env::set_var("FIREHOSE_CONFIG", file.path());
        let settings = Settings::load().unwrap();
        env::remove_var("FIREHOSE_CONFIG");

        assert_eq!(settings.driver.batch_size, 3);
        assert_eq!(settings.driver.workers, 0);
    }
}
