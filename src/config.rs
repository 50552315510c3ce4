use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::Path;

use crate::error::RelayError;
use crate::types::Chain;

/// Main configuration for the validator
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Private key that signs all destination-chain transactions
    pub validator_private_key: String,
    pub mode: NetworkMode,
    pub networks: Networks,
    pub relayer: RelayerConfig,
}

/// Custom Debug that redacts the validator key to prevent accidental log leakage.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("validator_private_key", &"<redacted>")
            .field("mode", &self.mode)
            .field("networks", &self.networks)
            .field("relayer", &self.relayer)
            .finish()
    }
}

/// Mainnet/testnet switch. Selects which pair of [`NetworkProfile`]s the
/// Base and Aetherius roles bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum NetworkMode {
    Mainnet,
    Testnet,
}

impl NetworkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkMode::Mainnet => "mainnet",
            NetworkMode::Testnet => "testnet",
        }
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One RPC endpoint + bridge contract binding. Immutable after load.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkProfile {
    pub rpc_url: String,
    pub bridge_address: String,
}

/// All four configured network profiles (two networks x two modes).
#[derive(Debug, Clone, Deserialize)]
pub struct Networks {
    pub base: NetworkProfile,
    pub aetherius: NetworkProfile,
    pub base_testnet: NetworkProfile,
    pub aetherius_testnet: NetworkProfile,
}

/// Relay engine tuning
#[derive(Debug, Clone, Deserialize)]
pub struct RelayerConfig {
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_health_interval")]
    pub health_interval_secs: u64,
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

/// Default functions
fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    5000
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_health_interval() -> u64 {
    30
}

fn default_reconnect_delay() -> u64 {
    60
}

fn default_queue_capacity() -> usize {
    64
}

fn required(key: &str) -> Result<String, RelayError> {
    env::var(key).map_err(|_| {
        RelayError::Configuration(format!("{} environment variable is required", key))
    })
}

fn optional(key: &str) -> String {
    env::var(key).unwrap_or_default()
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self, RelayError> {
        Self::load_from_file(".env").or_else(|_| Self::load_from_env())
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self, RelayError> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path).map_err(|e| {
                RelayError::Configuration(format!("failed to load .env file from {}: {}", path, e))
            })?;
        }
        Self::load_from_env()
    }

    /// Load configuration from environment variables
    fn load_from_env() -> Result<Self, RelayError> {
        let mode = if optional("NETWORK_ENV") == "testnet" {
            NetworkMode::Testnet
        } else {
            NetworkMode::Mainnet
        };

        // Only the profiles selected by NETWORK_ENV are required; the other
        // pair may legitimately be absent in a single-mode deployment.
        let (base, aetherius, base_testnet, aetherius_testnet) = match mode {
            NetworkMode::Mainnet => (
                NetworkProfile {
                    rpc_url: required("BASE_RPC_URL")?,
                    bridge_address: required("BASE_BRIDGE_CONTRACT")?,
                },
                NetworkProfile {
                    rpc_url: required("AETHERIUS_RPC_URL")?,
                    bridge_address: required("AETHERIUS_BRIDGE_CONTRACT")?,
                },
                NetworkProfile {
                    rpc_url: optional("BASE_TESTNET_RPC_URL"),
                    bridge_address: optional("BASE_TESTNET_BRIDGE_CONTRACT"),
                },
                NetworkProfile {
                    rpc_url: optional("AETHERIUS_TESTNET_RPC_URL"),
                    bridge_address: optional("AETHERIUS_TESTNET_BRIDGE_CONTRACT"),
                },
            ),
            NetworkMode::Testnet => (
                NetworkProfile {
                    rpc_url: optional("BASE_RPC_URL"),
                    bridge_address: optional("BASE_BRIDGE_CONTRACT"),
                },
                NetworkProfile {
                    rpc_url: optional("AETHERIUS_RPC_URL"),
                    bridge_address: optional("AETHERIUS_BRIDGE_CONTRACT"),
                },
                NetworkProfile {
                    rpc_url: required("BASE_TESTNET_RPC_URL")?,
                    bridge_address: required("BASE_TESTNET_BRIDGE_CONTRACT")?,
                },
                NetworkProfile {
                    rpc_url: required("AETHERIUS_TESTNET_RPC_URL")?,
                    bridge_address: required("AETHERIUS_TESTNET_BRIDGE_CONTRACT")?,
                },
            ),
        };

        let relayer = RelayerConfig {
            retry_attempts: parsed_or("RETRY_ATTEMPTS", default_retry_attempts()),
            retry_delay_ms: parsed_or("RETRY_DELAY_MS", default_retry_delay()),
            poll_interval_ms: parsed_or("POLL_INTERVAL_MS", default_poll_interval()),
            health_interval_secs: parsed_or("HEALTH_INTERVAL_SECS", default_health_interval()),
            reconnect_delay_secs: parsed_or("RECONNECT_DELAY_SECS", default_reconnect_delay()),
            queue_capacity: parsed_or("EVENT_QUEUE_CAPACITY", default_queue_capacity()),
        };

        let config = Config {
            validator_private_key: required("VALIDATOR_PRIVATE_KEY")?,
            mode,
            networks: Networks {
                base,
                aetherius,
                base_testnet,
                aetherius_testnet,
            },
            relayer,
        };

        config.validate()?;
        Ok(config)
    }

    /// Profile bound to a chain role under the configured mode.
    pub fn profile(&self, chain: Chain) -> &NetworkProfile {
        match (chain, self.mode) {
            (Chain::Base, NetworkMode::Mainnet) => &self.networks.base,
            (Chain::Base, NetworkMode::Testnet) => &self.networks.base_testnet,
            (Chain::Aetherius, NetworkMode::Mainnet) => &self.networks.aetherius,
            (Chain::Aetherius, NetworkMode::Testnet) => &self.networks.aetherius_testnet,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), RelayError> {
        // Validate validator key format
        if self.validator_private_key.len() != 66 || !self.validator_private_key.starts_with("0x")
        {
            return Err(RelayError::Configuration(
                "VALIDATOR_PRIVATE_KEY must be 66 chars (0x + 64 hex chars)".to_string(),
            ));
        }

        let base = self.profile(Chain::Base);
        let aetherius = self.profile(Chain::Aetherius);

        for (name, profile) in [("base", base), ("aetherius", aetherius)] {
            if profile.rpc_url.is_empty() {
                return Err(RelayError::Configuration(format!(
                    "{} RPC URL for {} cannot be empty",
                    name, self.mode
                )));
            }
            if profile.bridge_address.len() != 42 || !profile.bridge_address.starts_with("0x") {
                return Err(RelayError::Configuration(format!(
                    "{} bridge address for {} must be a valid hex address (42 chars with 0x prefix)",
                    name, self.mode
                )));
            }
        }

        // Source and destination must never be the same underlying network.
        if base.rpc_url == aetherius.rpc_url {
            return Err(RelayError::Configuration(
                "base and aetherius RPC URLs point at the same network".to_string(),
            ));
        }
        if base.bridge_address.eq_ignore_ascii_case(&aetherius.bridge_address) {
            return Err(RelayError::Configuration(
                "base and aetherius bridge addresses are identical".to_string(),
            ));
        }

        if self.relayer.queue_capacity == 0 {
            return Err(RelayError::Configuration(
                "EVENT_QUEUE_CAPACITY must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            validator_private_key:
                "0x0000000000000000000000000000000000000000000000000000000000000001".to_string(),
            mode: NetworkMode::Mainnet,
            networks: Networks {
                base: NetworkProfile {
                    rpc_url: "http://localhost:8545".to_string(),
                    bridge_address: "0x0000000000000000000000000000000000000001".to_string(),
                },
                aetherius: NetworkProfile {
                    rpc_url: "http://localhost:8546".to_string(),
                    bridge_address: "0x0000000000000000000000000000000000000002".to_string(),
                },
                base_testnet: NetworkProfile::default(),
                aetherius_testnet: NetworkProfile::default(),
            },
            relayer: RelayerConfig {
                retry_attempts: 3,
                retry_delay_ms: 5000,
                poll_interval_ms: 1000,
                health_interval_secs: 30,
                reconnect_delay_secs: 60,
                queue_capacity: 64,
            },
        }
    }

    #[test]
    fn test_default_retry_attempts() {
        assert_eq!(default_retry_attempts(), 3);
    }

    #[test]
    fn test_default_retry_delay() {
        assert_eq!(default_retry_delay(), 5000);
    }

    #[test]
    fn test_default_health_interval() {
        assert_eq!(default_health_interval(), 30);
    }

    #[test]
    fn test_default_reconnect_delay() {
        assert_eq!(default_reconnect_delay(), 60);
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_private_key_validation() {
        let mut config = test_config();
        config.validator_private_key = "0x123".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bridge_address_validation() {
        let mut config = test_config();
        config.networks.base.bridge_address = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_same_network_rejected() {
        let mut config = test_config();
        config.networks.aetherius.rpc_url = config.networks.base.rpc_url.clone();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("same network"), "{}", err);

        let mut config = test_config();
        config.networks.aetherius.bridge_address = config.networks.base.bridge_address.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_queue_capacity_rejected() {
        let mut config = test_config();
        config.relayer.queue_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mode_selects_profiles() {
        let mut config = test_config();
        assert_eq!(config.profile(Chain::Base).rpc_url, "http://localhost:8545");

        config.mode = NetworkMode::Testnet;
        config.networks.base_testnet = NetworkProfile {
            rpc_url: "http://localhost:9545".to_string(),
            bridge_address: "0x0000000000000000000000000000000000000003".to_string(),
        };
        assert_eq!(config.profile(Chain::Base).rpc_url, "http://localhost:9545");
    }

    #[test]
    fn test_testnet_mode_validates_testnet_profiles() {
        let mut config = test_config();
        config.mode = NetworkMode::Testnet;
        // Testnet profiles are empty in the fixture, so validation must fail.
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let config = test_config();
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains(&config.validator_private_key));
    }
}
