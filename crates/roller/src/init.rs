//! `roller config init`: rollapp node home, verified genesis, DA light node.

use crate::{sequencer, Roller, RollerError};
use da_layer::{default_da_config, new_provider, KeyInfo};
use genesis::{fetch_and_verify, GenesisDescriptor, GenesisSource};
use hub_client::{HubClient, HUB_SEQUENCER_KEY};
use process_runner::CommandSpec;
use roller_config::RollappConfig;
use tracing::{info, warn};

/// What an operator needs to see after a successful init.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOutcome {
    /// `None` when the hub is a local mock and genesis was not fetched.
    pub genesis: Option<GenesisDescriptor>,
    /// DA key recovery phrase. Empty if the backend printed none.
    pub da_mnemonic: String,
    /// DA account to fund, if the backend has one.
    pub da_address: Option<KeyInfo>,
}

impl Roller {
    /// Initialize a rollapp home from `config` and persist it.
    ///
    /// Denoms come from the verified genesis unless the hub is a mock. The
    /// config is written only after every step succeeded.
    pub async fn initialize_rollapp(
        &self,
        config: &mut RollappConfig,
        genesis_source: &dyn GenesisSource,
    ) -> Result<InitOutcome, RollerError> {
        if !config.da.backend.is_supported() {
            return Err(RollerError::UnsupportedDa(config.da.backend.to_string()));
        }

        let init_cmd = CommandSpec::new(config.rollapp_binary.as_str())
            .args(["init", HUB_SEQUENCER_KEY, "--chain-id", config.rollapp_id.as_str()])
            .arg("--home")
            .path_arg(config.rollapp_home());
        self.runner().run(&init_cmd)?;

        let genesis = if config.hub_data.is_mock() {
            info!("Mock hub, keeping configured denoms");
            None
        } else {
            let hub = HubClient::new(config.hub_data.clone(), self.runner());
            let metadata = hub.show_rollapp(&config.rollapp_id)?.genesis_metadata()?;
            let descriptor =
                fetch_and_verify(genesis_source, &config.home, &metadata, &config.rollapp_id)
                    .await?;
            config.base_denom = descriptor.base_denom.clone();
            config.denom = descriptor.denom.clone();
            Some(descriptor)
        };

        if config.da.id.is_empty() {
            config.da = default_da_config(config.da.backend);
        }
        let provider = new_provider(config.da.backend, config, self.runner());
        let da_mnemonic = provider.initialize_light_node_config()?;
        sequencer::set_rollapp_config(config, provider.as_ref())?;

        let da_address = provider.get_da_account_address().unwrap_or_else(|e| {
            warn!("Could not read the {} DA address: {}", config.da.backend, e);
            None
        });

        config.roller_version = self.version().to_string();
        self.store().write(config)?;
        info!(
            "Initialized rollapp {} with {} DA on {}",
            config.rollapp_id,
            config.da.backend,
            provider.get_network_name()
        );

        Ok(InitOutcome {
            genesis,
            da_mnemonic,
            da_address,
        })
    }
}
