//! Rollapp node configs: `dymint.toml`, `app.toml` and `config.toml` under
//! `<home>/rollapp/config`.

use crate::RollerError;
use da_layer::sequencer_config::restore_namespace_from_dymint;
use da_layer::{DataAvailabilityProvider, NodeType};
use roller_config::{dirs, update_field_in_toml, RollappConfig};
use std::path::PathBuf;
use tracing::{debug, info};

pub const DEFAULT_BLOCK_TIME: &str = "0.2s";
pub const DEFAULT_BATCH_SUBMIT_MAX_TIME: &str = "100s";
pub const DEFAULT_RPC_LADDR: &str = "tcp://0.0.0.0:26657";

fn node_config_dir(config: &RollappConfig) -> PathBuf {
    config.rollapp_home().join("config")
}

/// Point the sequencer at `provider`: writes `da_layer` and `da_config`.
///
/// A namespace already recorded in `da_config` is kept.
pub fn update_dymint_da_config(
    config: &RollappConfig,
    provider: &dyn DataAvailabilityProvider,
) -> Result<(), RollerError> {
    let dymint = config.dymint_config_path();
    restore_namespace_from_dymint(provider, &dymint);
    let da_config = provider.get_sequencer_da_config(NodeType::Sequencer)?;

    update_field_in_toml(&dymint, "da_layer", provider.da_type().as_str())?;
    update_field_in_toml(&dymint, "da_config", da_config)?;
    debug!("Updated DA settings in {}", dymint.display());
    Ok(())
}

/// Write the settlement and block production defaults, then the DA settings.
pub fn set_default_dymint_config(
    config: &RollappConfig,
    provider: &dyn DataAvailabilityProvider,
) -> Result<(), RollerError> {
    let dymint = config.dymint_config_path();
    let settlement = if config.hub_data.is_mock() {
        "mock"
    } else {
        "dymension"
    };
    let hub_keys = config.home.join(dirs::HUB_KEYS);

    update_field_in_toml(&dymint, "settlement_layer", settlement)?;
    update_field_in_toml(&dymint, "node_address", config.hub_data.rpc_url.as_str())?;
    update_field_in_toml(&dymint, "rollapp_id", config.rollapp_id.as_str())?;
    update_field_in_toml(&dymint, "block_time", DEFAULT_BLOCK_TIME)?;
    update_field_in_toml(&dymint, "batch_submit_max_time", DEFAULT_BATCH_SUBMIT_MAX_TIME)?;
    update_field_in_toml(&dymint, "keyring_backend", config.keyring_backend.as_str())?;
    update_field_in_toml(&dymint, "keyring_home_dir", hub_keys.to_string_lossy().into_owned())?;
    update_field_in_toml(&dymint, "dym_account_name", hub_client::HUB_SEQUENCER_KEY)?;
    if !config.hub_data.gas_price.is_empty() {
        update_field_in_toml(
            &dymint,
            "gas_prices",
            format!("{}{}", config.hub_data.gas_price, hub_client::HUB_DENOM),
        )?;
    }
    update_dymint_da_config(config, provider)
}

/// `app.toml`: zero gas price in the rollapp denom and the REST API enabled.
pub fn set_app_config(config: &RollappConfig) -> Result<(), RollerError> {
    let app = node_config_dir(config).join("app.toml");
    update_field_in_toml(&app, "minimum-gas-prices", format!("0{}", config.base_denom))?;
    update_field_in_toml(&app, "api.enable", true)?;
    Ok(())
}

/// `config.toml`: listen for RPC on every interface.
pub fn set_tm_config(config: &RollappConfig) -> Result<(), RollerError> {
    let tm = node_config_dir(config).join("config.toml");
    update_field_in_toml(&tm, "rpc.laddr", DEFAULT_RPC_LADDR)?;
    Ok(())
}

/// Write every rollapp node config for a freshly initialized rollapp.
pub fn set_rollapp_config(
    config: &RollappConfig,
    provider: &dyn DataAvailabilityProvider,
) -> Result<(), RollerError> {
    set_app_config(config)?;
    set_tm_config(config)?;
    set_default_dymint_config(config, provider)?;
    info!("Rollapp node configs written under {}", node_config_dir(config).display());
    Ok(())
}
