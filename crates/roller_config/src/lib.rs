//! Persisted rollapp configuration.
//!
//! This crate owns the `roller.toml` record that every roller operation
//! loads first, the [`ConfigStore`] abstraction used to read and write it,
//! and helpers for editing other TOML files (light node and sequencer
//! configs) one field at a time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

pub mod fs;
pub mod toml_fields;

pub use toml_fields::{get_key_from_toml, update_field_in_toml};

/// File name of the persisted roller config inside the home directory.
pub const ROLLER_CONFIG_FILE: &str = "roller.toml";

/// Well-known directory names under the roller home.
pub mod dirs {
    /// Rollapp node home (holds `config/dymint.toml`, `config/genesis.json`).
    pub const ROLLAPP: &str = "rollapp";
    /// DA light node home, shared by every DA backend.
    pub const DA_LIGHT_NODE: &str = "da-light-node";
    /// Key store under a node home.
    pub const KEYS: &str = "keys";
    /// Keyring of the sequencer's hub account.
    pub const HUB_KEYS: &str = "hub-keys";
    /// Logs of detached processes.
    pub const LOGS: &str = "logs";
}

/// Errors that can occur when reading or writing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("key {key} not found in {path}")]
    KeyNotFound { path: PathBuf, key: String },
    #[error("key {key} in {path} is not a table")]
    NotATable { path: PathBuf, key: String },
    #[error("invalid DA type {0:?}, supported types are: celestia, avail, local")]
    InvalidDaType(String),
}

impl ConfigError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// DA backend selector as recorded in `roller.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum DaType {
    Celestia,
    Avail,
    Local,
    /// Name used for the local backend before 0.1.12. Only ever read from
    /// old configs; migrations rewrite it to [`DaType::Local`].
    Mock,
}

/// Backends an operator may select.
pub const SUPPORTED_DAS: [DaType; 3] = [DaType::Celestia, DaType::Avail, DaType::Local];

impl DaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DaType::Celestia => "celestia",
            DaType::Avail => "avail",
            DaType::Local => "local",
            DaType::Mock => "mock",
        }
    }

    /// Whether this backend may be selected by `set da`.
    pub fn is_supported(&self) -> bool {
        SUPPORTED_DAS.contains(self)
    }
}

impl fmt::Display for DaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for DaType {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for DaType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "celestia" => Ok(DaType::Celestia),
            "avail" => Ok(DaType::Avail),
            "local" => Ok(DaType::Local),
            "mock" => Ok(DaType::Mock),
            _ => Err(ConfigError::InvalidDaType(s.to_string())),
        }
    }
}

/// Connection data for the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HubData {
    /// Hub chain id, `"mock"` for a local development hub.
    pub id: String,
    pub api_url: String,
    pub rpc_url: String,
    pub archive_rpc_url: String,
    pub gas_price: String,
}

impl HubData {
    /// A local development hub; genesis is not fetched from it.
    pub fn is_mock(&self) -> bool {
        self.id == "mock"
    }
}

/// Selected DA backend and its connection parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaConfig {
    pub backend: DaType,
    /// DA network id, e.g. `mocha-4`.
    pub id: String,
    pub api_url: String,
    /// Consensus RPC used for balance queries.
    pub rpc_url: String,
    /// Core node the light client syncs from.
    pub state_node: String,
}

impl Default for DaConfig {
    fn default() -> Self {
        Self {
            backend: DaType::Local,
            id: String::new(),
            api_url: String::new(),
            rpc_url: String::new(),
            state_node: String::new(),
        }
    }
}

/// The persisted roller configuration for one rollapp home.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollappConfig {
    pub home: PathBuf,
    /// Tool version that last wrote this file.
    pub roller_version: String,
    pub rollapp_id: String,
    pub rollapp_binary: String,
    pub hub_data: HubData,
    pub da: DaConfig,
    pub base_denom: String,
    pub denom: String,
    pub decimals: u32,
    pub keyring_backend: String,
}

impl Default for RollappConfig {
    fn default() -> Self {
        Self {
            home: PathBuf::new(),
            roller_version: String::new(),
            rollapp_id: String::new(),
            rollapp_binary: "rollapp-evm".to_string(),
            hub_data: HubData::default(),
            da: DaConfig::default(),
            base_denom: String::new(),
            denom: String::new(),
            decimals: 18,
            keyring_backend: "test".to_string(),
        }
    }
}

impl RollappConfig {
    /// `<home>/rollapp`
    pub fn rollapp_home(&self) -> PathBuf {
        self.home.join(dirs::ROLLAPP)
    }

    /// `<home>/da-light-node`
    pub fn da_light_node_dir(&self) -> PathBuf {
        self.home.join(dirs::DA_LIGHT_NODE)
    }

    /// `<home>/roller.toml`
    pub fn config_path(&self) -> PathBuf {
        config_path(&self.home)
    }

    /// `<home>/rollapp/config/dymint.toml`
    pub fn dymint_config_path(&self) -> PathBuf {
        dymint_config_path(&self.home)
    }
}

/// `<home>/roller.toml`
pub fn config_path(home: &Path) -> PathBuf {
    home.join(ROLLER_CONFIG_FILE)
}

/// Sequencer config of the rollapp node under `home`.
pub fn dymint_config_path(home: &Path) -> PathBuf {
    home.join(dirs::ROLLAPP).join("config").join("dymint.toml")
}

/// Durable storage for [`RollappConfig`].
///
/// No locking is done; one roller process per home is assumed.
pub trait ConfigStore: Send + Sync {
    /// Load the config for `home`.
    fn load(&self, home: &Path) -> Result<RollappConfig, ConfigError>;

    /// Persist the config at `config.home`.
    fn write(&self, config: &RollappConfig) -> Result<(), ConfigError>;
}

/// Stores the config as `<home>/roller.toml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlConfigStore;

impl ConfigStore for TomlConfigStore {
    fn load(&self, home: &Path) -> Result<RollappConfig, ConfigError> {
        let path = config_path(home);
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::io(&path, e))?;
        let mut config: RollappConfig =
            toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.clone(),
                message: e.to_string(),
            })?;
        // The directory we loaded from wins over a stale recorded path.
        config.home = home.to_path_buf();
        debug!("Loaded roller config from {}", path.display());
        Ok(config)
    }

    fn write(&self, config: &RollappConfig) -> Result<(), ConfigError> {
        let path = config.config_path();
        std::fs::create_dir_all(&config.home).map_err(|e| ConfigError::io(&config.home, e))?;
        let content = toml::to_string_pretty(config)?;
        // Staged beside the target, then renamed over it.
        let staged = path.with_extension("toml.tmp");
        std::fs::write(&staged, content).map_err(|e| ConfigError::io(&staged, e))?;
        std::fs::rename(&staged, &path).map_err(|e| ConfigError::io(&path, e))?;
        debug!("Wrote roller config to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(home: &Path) -> RollappConfig {
        RollappConfig {
            home: home.to_path_buf(),
            roller_version: "0.1.12".to_string(),
            rollapp_id: "myrollapp_1234-1".to_string(),
            hub_data: HubData {
                id: "froopyland_100-1".to_string(),
                rpc_url: "https://froopyland.rpc".to_string(),
                ..Default::default()
            },
            da: DaConfig {
                backend: DaType::Celestia,
                id: "mocha-4".to_string(),
                ..Default::default()
            },
            base_denom: "urax".to_string(),
            denom: "rax".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let config = sample(dir.path());

        TomlConfigStore.write(&config).unwrap();
        let loaded = TomlConfigStore.load(dir.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_tolerates_hand_edited_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(ROLLER_CONFIG_FILE),
            r#"
# edited by hand
rollapp_id = "rollapp_1-1"
roller_version = "v0.1.10"

[da]
backend = "mock"
"#,
        )
        .unwrap();

        let config = TomlConfigStore.load(dir.path()).unwrap();
        assert_eq!(config.rollapp_id, "rollapp_1-1");
        assert_eq!(config.da.backend, DaType::Mock);
        assert_eq!(config.home, dir.path());
        assert_eq!(config.decimals, 18);
    }

    #[test]
    fn test_backend_name_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(ROLLER_CONFIG_FILE),
            "[da]\nbackend = \"Celestia\"\n",
        )
        .unwrap();
        assert_eq!(
            TomlConfigStore.load(dir.path()).unwrap().da.backend,
            DaType::Celestia
        );

        std::fs::write(
            dir.path().join(ROLLER_CONFIG_FILE),
            "[da]\nbackend = \"bitcoin\"\n",
        )
        .unwrap();
        assert!(matches!(
            TomlConfigStore.load(dir.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = sample(dir.path());
        TomlConfigStore.write(&config).unwrap();

        config.rollapp_id = "other_1-1".to_string();
        TomlConfigStore.write(&config).unwrap();

        assert_eq!(
            TomlConfigStore.load(dir.path()).unwrap().rollapp_id,
            "other_1-1"
        );
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from(ROLLER_CONFIG_FILE)]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = TomlConfigStore.load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(ROLLER_CONFIG_FILE), "rollapp_id = [").unwrap();
        let err = TomlConfigStore.load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_da_type_parsing() {
        assert_eq!("Celestia".parse::<DaType>().unwrap(), DaType::Celestia);
        assert_eq!("local".parse::<DaType>().unwrap(), DaType::Local);
        assert!(!"mock".parse::<DaType>().unwrap().is_supported());
        assert!(matches!(
            "bitcoin".parse::<DaType>(),
            Err(ConfigError::InvalidDaType(_))
        ));
    }
}
