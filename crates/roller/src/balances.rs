//! Funding diagnostics for the DA light node and the hub sequencer account.

use crate::Roller;
use da_layer::{new_provider, DaError, DataAvailabilityProvider, UnderfundedAddress};
use hub_client::{HubClient, HubError, HUB_DENOM, HUB_MIN_BALANCE, HUB_SEQUENCER_KEY};
use num_bigint::BigUint;
use roller_config::{dirs, RollappConfig};
use thiserror::Error;
use tracing::{debug, warn};

/// A balance could not be queried. Distinct from an account being short.
#[derive(Error, Debug)]
pub enum BalanceQueryError {
    #[error("failed to query {network} DA balances: {source}")]
    Da {
        network: String,
        #[source]
        source: DaError,
    },
    #[error("failed to query hub balances: {0}")]
    Hub(#[from] HubError),
}

pub struct AccountBalanceChecker;

impl AccountBalanceChecker {
    /// Accounts of `provider` below their minimum balance.
    pub fn check_funding(
        provider: &dyn DataAvailabilityProvider,
    ) -> Result<Vec<UnderfundedAddress>, BalanceQueryError> {
        let underfunded = provider
            .check_da_balance()
            .map_err(|source| BalanceQueryError::Da {
                network: provider.get_network_name(),
                source,
            })?;
        for account in &underfunded {
            warn!(
                "{} ({}) holds {}{}, needs {}{}",
                account.key_name,
                account.address,
                account.current_balance,
                account.denom,
                account.required_balance,
                account.denom
            );
        }
        Ok(underfunded)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FundingReport {
    pub da: Vec<UnderfundedAddress>,
    pub hub: Vec<UnderfundedAddress>,
}

impl FundingReport {
    pub fn is_funded(&self) -> bool {
        self.da.is_empty() && self.hub.is_empty()
    }

    pub fn underfunded(&self) -> impl Iterator<Item = &UnderfundedAddress> {
        self.da.iter().chain(self.hub.iter())
    }
}

impl Roller {
    /// Check the DA account and, unless the hub is a mock, the sequencer's
    /// hub account.
    pub fn check_funding(
        &self,
        config: &RollappConfig,
    ) -> Result<FundingReport, BalanceQueryError> {
        let provider = new_provider(config.da.backend, config, self.runner());
        let da = AccountBalanceChecker::check_funding(provider.as_ref())?;

        let hub = if config.hub_data.is_mock() {
            debug!("Mock hub, skipping sequencer balance");
            Vec::new()
        } else {
            let client = HubClient::new(config.hub_data.clone(), self.runner());
            let key = client.show_key(HUB_SEQUENCER_KEY, &config.home.join(dirs::HUB_KEYS))?;
            client
                .check_funding(
                    HUB_SEQUENCER_KEY,
                    &key.address,
                    HUB_DENOM,
                    &BigUint::from(HUB_MIN_BALANCE),
                )?
                .into_iter()
                .collect()
        };

        Ok(FundingReport { da, hub })
    }
}
