//! Light client port settings. Only the Celestia light node has ports to set.

use crate::{sequencer, Roller, RollerError};
use da_layer::Celestia;
use roller_config::{update_field_in_toml, DaType, RollappConfig};
use tracing::info;

pub const RPC_PORT_KEY: &str = "RPC.Port";
pub const GATEWAY_PORT_KEY: &str = "Gateway.Port";

/// Parse a TCP port in `1..=65535`.
pub fn validate_port(value: &str) -> Result<u16, RollerError> {
    match value.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(RollerError::InvalidPort(value.to_string())),
    }
}

impl Roller {
    pub fn set_lc_rpc_port(&self, config: &RollappConfig, value: &str) -> Result<(), RollerError> {
        self.set_lc_port(config, RPC_PORT_KEY, value)
    }

    pub fn set_lc_gateway_port(
        &self,
        config: &RollappConfig,
        value: &str,
    ) -> Result<(), RollerError> {
        self.set_lc_port(config, GATEWAY_PORT_KEY, value)
    }

    fn set_lc_port(
        &self,
        config: &RollappConfig,
        key: &str,
        value: &str,
    ) -> Result<(), RollerError> {
        let port = validate_port(value)?;
        if config.da.backend != DaType::Celestia {
            return Err(RollerError::PortsUnsupported(config.da.backend));
        }

        let celestia = Celestia::new(config, self.runner());
        update_field_in_toml(&celestia.light_node_config_path(), key, port.to_string())?;
        info!("Set light client {} to {}", key, port);

        // The endpoint in the sequencer's DA config follows the RPC port.
        sequencer::update_dymint_da_config(config, &celestia)
    }
}
