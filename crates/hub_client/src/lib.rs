//! Client for the hub chain.
//!
//! Queries go through the hub binary (`dymd`) rather than a direct RPC
//! connection, so the JSON shapes here are those of `dymd q ... -o json`.

use da_layer::balance::BankBalancesResponse;
use da_layer::{KeyInfo, UnderfundedAddress};
use genesis::HubGenesisMetadata;
use num_bigint::BigUint;
use process_runner::{CommandSpec, ProcessError, ProcessRunner};
use roller_config::HubData;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub const HUB_BINARY: &str = "dymd";

/// Key the sequencer uses on the hub.
pub const HUB_SEQUENCER_KEY: &str = "hub_sequencer";
pub const HUB_DENOM: &str = "adym";

/// Minimum sequencer balance on the hub, in adym.
pub const HUB_MIN_BALANCE: u64 = 1;

/// Errors that can occur when querying the hub.
#[derive(Error, Debug)]
pub enum HubError {
    #[error("process error: {0}")]
    Process(#[from] ProcessError),
    #[error("invalid hub response: {0}")]
    InvalidResponse(String),
    #[error("rollapp {0} has no genesis URL or checksum registered on the hub")]
    MissingGenesisMetadata(String),
}

/// A rollapp as registered on the hub.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RollappInfo {
    pub rollapp_id: String,
    pub genesis_info: GenesisInfo,
    pub metadata: RollappMetadata,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GenesisInfo {
    pub genesis_checksum: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RollappMetadata {
    pub genesis_url: String,
}

#[derive(Deserialize)]
struct ShowRollappResponse {
    rollapp: RollappInfo,
}

impl RollappInfo {
    /// Genesis URL and checksum; both must be set.
    pub fn genesis_metadata(&self) -> Result<HubGenesisMetadata, HubError> {
        if self.metadata.genesis_url.is_empty() || self.genesis_info.genesis_checksum.is_empty() {
            return Err(HubError::MissingGenesisMetadata(self.rollapp_id.clone()));
        }
        Ok(HubGenesisMetadata {
            genesis_url: self.metadata.genesis_url.clone(),
            genesis_checksum: self.genesis_info.genesis_checksum.clone(),
        })
    }
}

/// Hub query client.
#[derive(Clone)]
pub struct HubClient {
    runner: Arc<dyn ProcessRunner>,
    hub: HubData,
}

impl HubClient {
    pub fn new(hub: HubData, runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner, hub }
    }

    fn query<T: for<'de> Deserialize<'de>>(&self, cmd: CommandSpec) -> Result<T, HubError> {
        let cmd = cmd.args(["--node", self.hub.rpc_url.as_str(), "-o", "json"]);
        let output = self.runner.run(&cmd)?;
        serde_json::from_str(output.stdout.trim())
            .map_err(|e| HubError::InvalidResponse(e.to_string()))
    }

    /// `dymd q rollapp show <rollapp-id>`
    pub fn show_rollapp(&self, rollapp_id: &str) -> Result<RollappInfo, HubError> {
        debug!("Querying hub {} for rollapp {}", self.hub.id, rollapp_id);
        let resp: ShowRollappResponse =
            self.query(CommandSpec::new(HUB_BINARY).args(["q", "rollapp", "show", rollapp_id]))?;
        Ok(resp.rollapp)
    }

    /// `dymd q bank balances <address>`
    pub fn query_balances(&self, address: &str) -> Result<BankBalancesResponse, HubError> {
        self.query(CommandSpec::new(HUB_BINARY).args(["q", "bank", "balances", address]))
    }

    /// `dymd keys show <name>` against a local test keyring.
    pub fn show_key(&self, name: &str, keyring_dir: &Path) -> Result<KeyInfo, HubError> {
        let cmd = CommandSpec::new(HUB_BINARY)
            .args(["keys", "show", name, "--keyring-backend", "test"])
            .arg("--keyring-dir")
            .path_arg(keyring_dir)
            .args(["--output", "json"]);
        let output = self.runner.run(&cmd)?;
        serde_json::from_str(output.stdout.trim())
            .map_err(|e| HubError::InvalidResponse(e.to_string()))
    }

    /// Report `address` if it holds less than `required` of `denom`.
    pub fn check_funding(
        &self,
        key_name: &str,
        address: &str,
        denom: &str,
        required: &BigUint,
    ) -> Result<Option<UnderfundedAddress>, HubError> {
        let current = self
            .query_balances(address)?
            .balance_of(denom)
            .map_err(HubError::InvalidResponse)?;
        if &current >= required {
            return Ok(None);
        }
        Ok(Some(UnderfundedAddress {
            key_name: key_name.to_string(),
            address: address.to_string(),
            current_balance: current,
            required_balance: required.clone(),
            denom: denom.to_string(),
            network: self.hub.id.clone(),
        }))
    }
}
