//! Configuration management with validation and defaults
//!
//! `ArcadeConfig` is assembled by `ConfigLoader` from an optional TOML file
//! and `ARCADE_*` environment overrides, then validated once at startup.

use crate::errors::{ArcadeResult, ConfigurationError};
use crate::wallet::UserId;
use serde::{Deserialize, Serialize};
use std::{env, path::Path};

/// Complete arcade configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArcadeConfig {
    pub wallet: WalletConfig,
    pub betting: BettingConfig,
    pub checkers: CheckersConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Wallet ledger behaviour
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Balance granted to an account on first sight and on reset
    pub starting_balance: u64,
    /// Users allowed to use the admin credit tools
    pub admin_ids: Vec<UserId>,
    /// Whether a creator may still cancel an escrow after others joined it
    pub allow_cancel_after_join: bool,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            starting_balance: 1000,
            admin_ids: Vec::new(),
            allow_cancel_after_join: true,
        }
    }
}

/// Betting game limits
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BettingConfig {
    /// Length of generated game ids (uppercase letters and digits)
    pub game_id_length: usize,
    pub min_stake: u64,
    pub max_stake: Option<u64>,
    /// Stake used by the quick solo commands when none is given
    pub quick_stake: u64,
}

impl Default for BettingConfig {
    fn default() -> Self {
        Self {
            game_id_length: 6,
            min_stake: 1,
            max_stake: None,
            quick_stake: 100,
        }
    }
}

/// Checkers rule options
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckersConfig {
    /// Plies without a capture or promotion after which the game is drawn
    pub quiet_move_draw_limit: Option<u32>,
}

impl Default for CheckersConfig {
    fn default() -> Self {
        Self {
            quiet_move_draw_limit: Some(80),
        }
    }
}

/// Which persistence substrate backs the ledger
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory only (tests, throwaway sessions)
    Memory,
    /// Single JSON document replaced atomically on every commit
    Json,
    /// RocksDB keyspace written with atomic batches
    Rocksdb,
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "json" => Ok(StorageBackend::Json),
            "rocksdb" | "rocks" => Ok(StorageBackend::Rocksdb),
            other => Err(ConfigurationError::InvalidValue {
                field: "storage.backend".to_string(),
                value: other.to_string(),
                reason: "expected memory, json or rocksdb".to_string(),
            }),
        }
    }
}

/// Storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// File path for the JSON backend, directory for RocksDB
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Json,
            path: "./data/user_wallets.json".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(ConfigurationError::InvalidValue {
                field: "logging.level".to_string(),
                value: other.to_string(),
                reason: "expected error, warn, info, debug or trace".to_string(),
            }),
        }
    }
}

impl ArcadeConfig {
    /// Configuration for tests and throwaway sessions: nothing touches disk
    pub fn testing() -> Self {
        Self {
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                path: String::new(),
            },
            logging: LoggingConfig {
                level: LogLevel::Debug,
            },
            ..Default::default()
        }
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.wallet.starting_balance == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "wallet.starting_balance".to_string(),
                value: "0".to_string(),
                reason: "starting balance must be > 0".to_string(),
            });
        }

        if !(4..=16).contains(&self.betting.game_id_length) {
            return Err(ConfigurationError::InvalidValue {
                field: "betting.game_id_length".to_string(),
                value: self.betting.game_id_length.to_string(),
                reason: "id length must be between 4 and 16".to_string(),
            });
        }

        if self.betting.min_stake == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "betting.min_stake".to_string(),
                value: "0".to_string(),
                reason: "minimum stake must be > 0".to_string(),
            });
        }

        if let Some(max) = self.betting.max_stake {
            if max < self.betting.min_stake {
                return Err(ConfigurationError::ValidationFailed(format!(
                    "betting.max_stake ({}) is below betting.min_stake ({})",
                    max, self.betting.min_stake
                )));
            }
        }

        if self.betting.quick_stake < self.betting.min_stake
            || self.betting.max_stake.map_or(false, |max| self.betting.quick_stake > max)
        {
            return Err(ConfigurationError::InvalidValue {
                field: "betting.quick_stake".to_string(),
                value: self.betting.quick_stake.to_string(),
                reason: "quick stake must lie within the stake limits".to_string(),
            });
        }

        if self.checkers.quiet_move_draw_limit == Some(0) {
            return Err(ConfigurationError::InvalidValue {
                field: "checkers.quiet_move_draw_limit".to_string(),
                value: "0".to_string(),
                reason: "use no limit instead of zero".to_string(),
            });
        }

        if self.storage.backend != StorageBackend::Memory && self.storage.path.trim().is_empty() {
            return Err(ConfigurationError::MissingRequired("storage.path".to_string()));
        }

        Ok(())
    }
}

/// Loads configuration from TOML and the environment
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: Some(path.as_ref().to_string_lossy().into_owned()),
        }
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> ArcadeResult<ArcadeConfig> {
        let mut config = match self.config_path {
            Some(ref path) => Self::load_from_file(path)?,
            None => ArcadeConfig::default(),
        };

        Self::apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(config)
    }

    fn load_from_file(path: &str) -> ArcadeResult<ArcadeConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        Self::parse(&content)
    }

    /// Parse a TOML document into a configuration (missing sections take defaults)
    pub fn parse(content: &str) -> ArcadeResult<ArcadeConfig> {
        toml::from_str(content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    fn apply_env_overrides(config: &mut ArcadeConfig) -> ArcadeResult<()> {
        if let Ok(balance) = env::var("ARCADE_STARTING_BALANCE") {
            config.wallet.starting_balance = balance.parse().map_err(|_| ConfigurationError::InvalidValue {
                field: "ARCADE_STARTING_BALANCE".to_string(),
                value: balance.clone(),
                reason: "Invalid credit amount".to_string(),
            })?;
        }

        if let Ok(ids) = env::var("ARCADE_ADMIN_IDS") {
            config.wallet.admin_ids = parse_id_list(&ids)?;
        }

        if let Ok(backend) = env::var("ARCADE_STORAGE_BACKEND") {
            config.storage.backend = backend.parse()?;
        }

        if let Ok(path) = env::var("ARCADE_STORAGE_PATH") {
            config.storage.path = path;
        }

        if let Ok(level) = env::var("ARCADE_LOG_LEVEL") {
            config.logging.level = level.parse()?;
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(config: &ArcadeConfig, path: &str) -> ArcadeResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

fn parse_id_list(raw: &str) -> Result<Vec<UserId>, ConfigurationError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse().map_err(|_| ConfigurationError::InvalidValue {
                field: "ARCADE_ADMIN_IDS".to_string(),
                value: part.to_string(),
                reason: "Invalid user id".to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ArcadeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.wallet.starting_balance, 1000);
        assert_eq!(config.betting.game_id_length, 6);
    }

    #[test]
    fn test_testing_config_is_valid() {
        let config = ArcadeConfig::testing();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_invalid_config_validation() {
        let mut config = ArcadeConfig::default();
        config.wallet.starting_balance = 0;
        assert!(config.validate().is_err());

        let mut config = ArcadeConfig::default();
        config.betting.min_stake = 50;
        config.betting.max_stake = Some(10);
        assert!(config.validate().is_err());

        let mut config = ArcadeConfig::default();
        config.storage.path = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_takes_defaults() {
        let config = ConfigLoader::parse(
            r#"
            [wallet]
            starting_balance = 250
            admin_ids = [7, 8]

            [storage]
            backend = "rocksdb"
            path = "./data/ledger"
            "#,
        )
        .expect("parse");

        assert_eq!(config.wallet.starting_balance, 250);
        assert_eq!(config.wallet.admin_ids, vec![7, 8]);
        assert!(config.wallet.allow_cancel_after_join);
        assert_eq!(config.storage.backend, StorageBackend::Rocksdb);
        assert_eq!(config.betting.game_id_length, 6);
        assert_eq!(config.checkers.quiet_move_draw_limit, Some(80));
    }

    #[test]
    fn test_toml_round_trip_through_save() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("arcade.toml");
        let path = path.to_string_lossy().into_owned();

        let mut config = ArcadeConfig::default();
        config.wallet.admin_ids = vec![42];
        ConfigLoader::save(&config, &path).expect("save");

        let loaded = ConfigLoader::with_file(&path).load().expect("load");
        assert_eq!(loaded.wallet.admin_ids, vec![42]);
    }

    #[test]
    fn test_id_list_parsing() {
        assert_eq!(parse_id_list("1, 2,3,").unwrap(), vec![1, 2, 3]);
        assert!(parse_id_list("1,x").is_err());
    }
}
