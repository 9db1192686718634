//! DA backends for a rollapp.
//!
//! Each backend wraps its own external binaries (light node, key tool,
//! balance query tool) behind [`DataAvailabilityProvider`]. A provider is
//! bound to one roller home and is created per operation with
//! [`new_provider`]; anything it memoizes (RPC port, namespace) lives only
//! as long as the instance.

use num_bigint::BigUint;
use process_runner::{CommandSpec, ProcessError, ProcessRunner};
use roller_config::{ConfigError, DaConfig, DaType, RollappConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

pub mod avail;
pub mod balance;
pub mod celestia;
pub mod local;
pub mod sequencer_config;

pub use avail::Avail;
pub use celestia::Celestia;
pub use local::Local;

/// Status reported when a backend cannot be queried.
pub const UNHEALTHY_STATUS: &str = "Stopped, Restarting...";

/// Status reported when a backend answered its liveness query.
pub const ACTIVE_STATUS: &str = "active";

/// Errors that can occur when driving a DA backend.
#[derive(Error, Debug)]
pub enum DaError {
    #[error("process error: {0}")]
    Process(#[from] ProcessError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid response from {program}: {message}")]
    InvalidResponse { program: String, message: String },
    #[error("failed to resolve light node RPC port from {path}: {source}")]
    RpcPortUnresolved {
        path: String,
        #[source]
        source: ConfigError,
    },
    #[error("invalid node type {0:?}, expected \"sequencer\" or \"fullnode\"")]
    InvalidNodeType(String),
}

impl DaError {
    pub(crate) fn invalid_response(program: &str, message: impl fmt::Display) -> Self {
        Self::InvalidResponse {
            program: program.to_string(),
            message: message.to_string(),
        }
    }
}

/// Which node the sequencer DA config is generated for.
///
/// The sequencer gets an admin token, full nodes a read-only one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Sequencer,
    FullNode,
}

impl NodeType {
    /// Celestia auth token permission level for this node type.
    pub fn auth_token_type(&self) -> &'static str {
        match self {
            NodeType::Sequencer => "admin",
            NodeType::FullNode => "read",
        }
    }
}

impl FromStr for NodeType {
    type Err = DaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequencer" => Ok(NodeType::Sequencer),
            "fullnode" | "full_node" => Ok(NodeType::FullNode),
            other => Err(DaError::InvalidNodeType(other.to_string())),
        }
    }
}

/// A named key and its address as reported by a key tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub name: String,
    pub address: String,
}

/// Address and balance of a funding account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountData {
    pub address: String,
    pub balance: BigUint,
}

/// An account whose balance is below the backend's minimum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnderfundedAddress {
    pub key_name: String,
    pub address: String,
    pub current_balance: BigUint,
    pub required_balance: BigUint,
    pub denom: String,
    pub network: String,
}

/// Shared behaviour of every DA backend.
pub trait DataAvailabilityProvider {
    /// The backend this provider drives.
    fn da_type(&self) -> DaType;

    /// Initialize the light node home and return the recovery mnemonic.
    ///
    /// An empty string means the binary printed no mnemonic.
    fn initialize_light_node_config(&self) -> Result<String, DaError>;

    /// The funding account, or `None` for backends without keys.
    fn get_da_account_address(&self) -> Result<Option<KeyInfo>, DaError>;

    /// Key name used for every key operation of this backend.
    fn get_key_name(&self) -> &'static str;

    /// Serialized DA config to embed in the sequencer's `dymint.toml`.
    ///
    /// An empty string means the backend needs no DA config.
    fn get_sequencer_da_config(&self, node_type: NodeType) -> Result<String, DaError>;

    /// Namespace identifier this instance publishes under, if any.
    fn get_namespace_id(&self) -> Option<String>;

    /// Reuse a namespace generated by an earlier instance.
    ///
    /// Returns false if this instance already settled on a namespace or the
    /// backend has none.
    fn restore_namespace_id(&self, namespace_id: &str) -> bool;

    /// Balances of every account this backend needs funded.
    fn get_da_acc_data(&self) -> Result<Vec<AccountData>, DaError>;

    /// Accounts below the minimum balance. Empty when all are funded.
    fn check_da_balance(&self) -> Result<Vec<UnderfundedAddress>, DaError>;

    /// Best-effort liveness; never fails.
    fn get_status(&self) -> String;

    fn get_light_node_endpoint(&self) -> Result<String, DaError>;

    fn get_network_name(&self) -> String;

    fn get_root_directory(&self) -> &Path;

    /// Command that starts the backend's long-running light node, if any.
    fn start_command(&self) -> Result<Option<CommandSpec>, DaError>;
}

/// Build the provider for `backend` bound to `config.home`.
///
/// The legacy `mock` backend maps to the local provider. Callers validate
/// user input with [`DaType::is_supported`] before getting here.
pub fn new_provider(
    backend: DaType,
    config: &RollappConfig,
    runner: Arc<dyn ProcessRunner>,
) -> Box<dyn DataAvailabilityProvider> {
    match backend {
        DaType::Celestia => Box::new(Celestia::new(config, runner)),
        DaType::Avail => Box::new(Avail::new(config, runner)),
        DaType::Local | DaType::Mock => Box::new(Local::new(&config.home)),
    }
}

/// Connection parameters a freshly selected backend starts from.
pub fn default_da_config(backend: DaType) -> DaConfig {
    match backend {
        DaType::Celestia => DaConfig {
            backend,
            id: celestia::DEFAULT_NETWORK.to_string(),
            api_url: "https://api-mocha.pops.one".to_string(),
            rpc_url: "https://rpc-mocha.pops.one:443".to_string(),
            state_node: "rpc-mocha.pops.one".to_string(),
        },
        DaType::Avail => DaConfig {
            backend,
            id: avail::DEFAULT_NETWORK.to_string(),
            api_url: avail::DEFAULT_API_URL.to_string(),
            ..Default::default()
        },
        DaType::Local | DaType::Mock => DaConfig {
            backend: DaType::Local,
            id: local::NETWORK_NAME.to_string(),
            ..Default::default()
        },
    }
}

pub(crate) fn run_json<T: for<'de> Deserialize<'de>>(
    runner: &dyn ProcessRunner,
    cmd: &CommandSpec,
) -> Result<T, DaError> {
    let output = runner.run(cmd)?;
    serde_json::from_str(output.stdout.trim())
        .map_err(|e| DaError::invalid_response(&cmd.program, e))
}
