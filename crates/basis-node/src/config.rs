//! Node configuration file.

use std::path::{Path, PathBuf};

use anyhow::bail;
use basis_ledger::LedgerParams;
use basis_types::Address;
use serde::{Deserialize, Serialize};

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Initial ledger parameters.
    #[serde(default)]
    pub ledger: LedgerParams,
    /// Addresses wired in at startup.
    #[serde(default)]
    pub roles: RolesConfig,
    /// JSON-RPC server settings.
    #[serde(default)]
    pub rpc: RpcConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Startup addresses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RolesConfig {
    /// Initial holder of both the operator and governor roles.
    #[serde(default)]
    pub deployer: Address,
    /// Address the ledger holds funds under.
    #[serde(default)]
    pub custody: Address,
    /// Address identifying the staked asset.
    #[serde(default)]
    pub asset: Address,
}

/// JSON-RPC configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Unix socket path. Empty = $data_dir/basis.sock.
    #[serde(default)]
    pub socket_path: String,
    /// Events buffered per subscriber before it starts lagging.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_event_buffer() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            socket_path: String::new(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::data_dir().join("config.toml"))
    }

    /// Load configuration from `path`, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: NodeConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Check the settings the node cannot start without.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.roles.deployer.is_zero() {
            bail!("roles.deployer must be set");
        }
        if self.roles.custody.is_zero() {
            bail!("roles.custody must be set");
        }
        if self.rpc.event_buffer == 0 {
            bail!("rpc.event_buffer must be non-zero");
        }
        self.ledger
            .validate()
            .map_err(|e| anyhow::anyhow!("ledger: {e}"))?;
        Ok(())
    }

    /// Path of the JSON-RPC socket.
    pub fn socket_path(&self) -> PathBuf {
        if self.rpc.socket_path.is_empty() {
            Self::data_dir().join("basis.sock")
        } else {
            PathBuf::from(&self.rpc.socket_path)
        }
    }

    /// Data directory: `$BASIS_DATA_DIR`, else `$HOME/.basis`.
    pub fn data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("BASIS_DATA_DIR") {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".basis"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/basis"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.ledger, LedgerParams::default());
        assert!(config.roles.deployer.is_zero());
        assert_eq!(config.rpc.event_buffer, 1000);
        assert_eq!(config.logging.log_level, "info");
    }

    #[test]
    fn test_default_config_fails_validation() {
        assert!(NodeConfig::default().validate().is_err());
    }

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
            [ledger]
            lock_period = 86400

            [roles]
            deployer = "0x0101010101010101010101010101010101010101"
            custody = "0xcccccccccccccccccccccccccccccccccccccccc"

            [rpc]
            socket_path = "/run/basis.sock"
        "#;
        let config: NodeConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.ledger.lock_period, 86400);
        assert_eq!(
            config.ledger.max_providers,
            LedgerParams::default().max_providers
        );
        assert_eq!(config.roles.deployer, Address::repeat(0x01));
        assert!(config.roles.asset.is_zero());
        assert_eq!(config.socket_path(), PathBuf::from("/run/basis.sock"));
        assert_eq!(config.rpc.event_buffer, 1000);
        config.validate().expect("valid");
    }

    #[test]
    fn test_bad_address_rejected() {
        let toml_str = r#"
            [roles]
            deployer = "0x1234"
        "#;
        assert!(toml::from_str::<NodeConfig>(toml_str).is_err());
    }

    #[test]
    fn test_zero_lock_period_fails_validation() {
        let mut config = NodeConfig::default();
        config.roles.deployer = Address::repeat(1);
        config.roles.custody = Address::repeat(2);
        config.ledger.lock_period = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = NodeConfig::default();
        config.roles.deployer = Address::repeat(0xab);
        let toml_str = toml::to_string(&config).expect("serialize");
        let parsed: NodeConfig = toml::from_str(&toml_str).expect("parse");
        assert_eq!(parsed.roles.deployer, config.roles.deployer);
    }
}
