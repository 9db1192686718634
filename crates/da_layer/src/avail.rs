//! Avail backend.
//!
//! The sequencer talks to an Avail RPC node directly, so there is no local
//! light node to run. Keys come from `subkey` and balances from
//! `polkadot-js-api`; the seed and app id live in `avail.toml`.

use crate::balance::parse_amount;
use crate::sequencer_config::AvailDaConfig;
use crate::{
    run_json, AccountData, DaError, DataAvailabilityProvider, KeyInfo, NodeType,
    UnderfundedAddress, ACTIVE_STATUS, UNHEALTHY_STATUS,
};
use num_bigint::BigUint;
use process_runner::{CommandSpec, ProcessRunner};
use roller_config::{dirs, ConfigError, DaType, RollappConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub const SUBKEY_BINARY: &str = "subkey";
pub const POLKADOT_JS_API_BINARY: &str = "polkadot-js-api";

pub const CONFIG_FILE_NAME: &str = "avail.toml";
pub const KEY_NAME: &str = "my_avail_key";
pub const DENOM: &str = "aAVL";
pub const DEFAULT_NETWORK: &str = "goldberg";
pub const DEFAULT_API_URL: &str = "wss://goldberg.avail.tools/ws";

/// Minimum account balance, in aAVL.
pub const MIN_BALANCE: u64 = 1;

/// `<home>/da-light-node/avail.toml`
pub fn cfg_file_path(home: &Path) -> PathBuf {
    home.join(dirs::DA_LIGHT_NODE).join(CONFIG_FILE_NAME)
}

/// `<home>/avail.toml`, where releases before 0.1.12 kept the file.
pub fn legacy_cfg_file_path(home: &Path) -> PathBuf {
    home.join(CONFIG_FILE_NAME)
}

/// Contents of `avail.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailConfig {
    pub seed: String,
    pub api_url: String,
    #[serde(default)]
    pub app_id: u32,
}

impl AvailConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubkeyOutput {
    #[serde(default)]
    secret_phrase: String,
    ss58_address: String,
}

#[derive(Deserialize)]
struct AccountQueryResponse {
    account: AccountInfo,
}

#[derive(Deserialize)]
struct AccountInfo {
    data: AccountBalances,
}

#[derive(Deserialize)]
struct AccountBalances {
    free: serde_json::Value,
}

/// Avail account bound to `<home>/da-light-node/avail.toml`.
pub struct Avail {
    root: PathBuf,
    network_id: String,
    api_url: String,
    runner: Arc<dyn ProcessRunner>,
}

impl Avail {
    pub fn new(config: &RollappConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        let api_url = if config.da.api_url.is_empty() {
            DEFAULT_API_URL.to_string()
        } else {
            config.da.api_url.clone()
        };
        Self {
            root: config.home.clone(),
            network_id: config.da.id.clone(),
            api_url,
            runner,
        }
    }

    pub fn config_path(&self) -> PathBuf {
        cfg_file_path(&self.root)
    }

    fn load_config(&self) -> Result<AvailConfig, DaError> {
        Ok(AvailConfig::load(&self.config_path())?)
    }

    fn network(&self) -> &str {
        if self.network_id.is_empty() {
            DEFAULT_NETWORK
        } else {
            &self.network_id
        }
    }

    fn free_balance(&self, address: &str) -> Result<BigUint, DaError> {
        let cmd = CommandSpec::new(POLKADOT_JS_API_BINARY)
            .args(["--ws", self.load_config()?.api_url.as_str()])
            .args(["query.system.account", address]);
        let resp: AccountQueryResponse = run_json(self.runner.as_ref(), &cmd)?;
        let raw = match &resp.account.data.free {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            other => {
                return Err(DaError::invalid_response(
                    POLKADOT_JS_API_BINARY,
                    format!("unexpected free balance {}", other),
                ))
            }
        };
        parse_amount(&raw).map_err(|e| DaError::invalid_response(POLKADOT_JS_API_BINARY, e))
    }
}

impl DataAvailabilityProvider for Avail {
    fn da_type(&self) -> DaType {
        DaType::Avail
    }

    fn initialize_light_node_config(&self) -> Result<String, DaError> {
        let cmd = CommandSpec::new(SUBKEY_BINARY).args(["generate", "--output-type", "json"]);
        let generated: SubkeyOutput = run_json(self.runner.as_ref(), &cmd)?;
        if generated.secret_phrase.is_empty() {
            return Err(DaError::invalid_response(SUBKEY_BINARY, "no secret phrase"));
        }

        let config = AvailConfig {
            seed: generated.secret_phrase.clone(),
            api_url: self.api_url.clone(),
            app_id: 0,
        };
        config.write(&self.config_path())?;
        info!("Wrote avail config to {}", self.config_path().display());

        Ok(generated.secret_phrase)
    }

    fn get_da_account_address(&self) -> Result<Option<KeyInfo>, DaError> {
        let config = self.load_config()?;
        let cmd = CommandSpec::new(SUBKEY_BINARY)
            .args(["inspect", config.seed.as_str(), "--output-type", "json"]);
        let inspected: SubkeyOutput = run_json(self.runner.as_ref(), &cmd)?;
        Ok(Some(KeyInfo {
            name: KEY_NAME.to_string(),
            address: inspected.ss58_address,
        }))
    }

    fn get_key_name(&self) -> &'static str {
        KEY_NAME
    }

    fn get_sequencer_da_config(&self, _node_type: NodeType) -> Result<String, DaError> {
        let config = self.load_config()?;
        Ok(AvailDaConfig {
            seed: config.seed,
            api_url: config.api_url,
            app_id: config.app_id,
            tip: 0,
        }
        .to_json())
    }

    /// Avail scopes data by app id rather than a generated namespace.
    fn get_namespace_id(&self) -> Option<String> {
        self.load_config().ok().map(|c| c.app_id.to_string())
    }

    fn restore_namespace_id(&self, _namespace_id: &str) -> bool {
        false
    }

    fn get_da_acc_data(&self) -> Result<Vec<AccountData>, DaError> {
        let key = self
            .get_da_account_address()?
            .ok_or_else(|| DaError::invalid_response(SUBKEY_BINARY, "no key"))?;
        let balance = self.free_balance(&key.address)?;
        Ok(vec![AccountData {
            address: key.address,
            balance,
        }])
    }

    fn check_da_balance(&self) -> Result<Vec<UnderfundedAddress>, DaError> {
        let required = BigUint::from(MIN_BALANCE);
        Ok(self
            .get_da_acc_data()?
            .into_iter()
            .filter(|acc| acc.balance < required)
            .map(|acc| UnderfundedAddress {
                key_name: KEY_NAME.to_string(),
                address: acc.address,
                current_balance: acc.balance,
                required_balance: required.clone(),
                denom: DENOM.to_string(),
                network: self.network().to_string(),
            })
            .collect())
    }

    fn get_status(&self) -> String {
        match self.get_da_acc_data() {
            Ok(_) => ACTIVE_STATUS.to_string(),
            Err(e) => {
                debug!("avail status query failed: {}", e);
                UNHEALTHY_STATUS.to_string()
            }
        }
    }

    fn get_light_node_endpoint(&self) -> Result<String, DaError> {
        Ok(self.load_config()?.api_url)
    }

    fn get_network_name(&self) -> String {
        self.network().to_string()
    }

    fn get_root_directory(&self) -> &Path {
        &self.root
    }

    fn start_command(&self) -> Result<Option<CommandSpec>, DaError> {
        Ok(None)
    }
}
