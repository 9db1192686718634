//! Rollapp configuration lifecycle.
//!
//! [`Roller`] ties the config store, the process runner and the DA backends
//! together into the operations the CLI exposes. Every operation starts from
//! [`Roller::load`], which runs pending config migrations before anything
//! else reads the config.

use da_layer::DaError;
use genesis::GenesisError;
use hub_client::HubError;
use migrations::{MigrationContext, MigrationEngine, MigrationError, VersionData};
use process_runner::{ProcessError, ProcessRunner};
use roller_config::{ConfigError, ConfigStore, DaType, RollappConfig};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub mod balances;
pub mod da_node;
pub mod init;
pub mod light_client;
pub mod sequencer;
pub mod set_da;

pub use balances::{AccountBalanceChecker, BalanceQueryError, FundingReport};
pub use init::InitOutcome;
pub use set_da::SetDaOutcome;

/// Errors that can occur in a roller operation.
#[derive(Error, Debug)]
pub enum RollerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Da(#[from] DaError),
    #[error(transparent)]
    Genesis(#[from] GenesisError),
    #[error(transparent)]
    Hub(#[from] HubError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("invalid DA type {0:?}, supported types are: celestia, avail, local")]
    UnsupportedDa(String),
    #[error("invalid port {0:?}, expected a number between 1 and 65535")]
    InvalidPort(String),
    #[error("setting light client ports is only supported for celestia, current DA is {0}")]
    PortsUnsupported(DaType),
    #[error("failed to read confirmation: {0}")]
    Prompt(#[source] std::io::Error),
}

/// Asks the operator to approve an irreversible step.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> std::io::Result<bool>;
}

/// Entry point for every roller operation.
pub struct Roller {
    store: Arc<dyn ConfigStore>,
    runner: Arc<dyn ProcessRunner>,
    version: VersionData,
}

impl Roller {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        runner: Arc<dyn ProcessRunner>,
        version: VersionData,
    ) -> Self {
        Self {
            store,
            runner,
            version,
        }
    }

    pub fn store(&self) -> &dyn ConfigStore {
        self.store.as_ref()
    }

    pub fn runner(&self) -> Arc<dyn ProcessRunner> {
        Arc::clone(&self.runner)
    }

    /// Version stamped into configs this instance writes.
    pub fn version(&self) -> VersionData {
        self.version
    }

    /// Load the config for `home` and bring it up to the current version.
    pub fn load(&self, home: &Path) -> Result<RollappConfig, RollerError> {
        let mut config = self.store.load(home)?;
        self.migrate(&mut config)?;
        Ok(config)
    }

    /// Run pending migrations, returning the names of those applied.
    pub fn migrate(&self, config: &mut RollappConfig) -> Result<Vec<&'static str>, RollerError> {
        let ctx = MigrationContext {
            store: self.store.as_ref(),
            runner: self.runner(),
        };
        Ok(MigrationEngine::new(self.version).run(config, &ctx)?)
    }
}


#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use super::*;
    use process_runner::testing::ScriptedRunner;

    #[test]
    fn test_load_runs_migrations_first() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let roller = roller(&runner);

        let mut old = config(dir.path(), DaType::Local);
        old.da.backend = DaType::Mock;
        old.roller_version = "v0.1.10".to_string();
        roller.store().write(&old).unwrap();

        let loaded = roller.load(dir.path()).unwrap();
        assert_eq!(loaded.da.backend, DaType::Local);
        assert_eq!(loaded.roller_version, "0.1.12");
        assert_eq!(roller.store().load(dir.path()).unwrap(), loaded);
    }

    #[test]
    fn test_load_current_config_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let roller = roller(&runner);

        let current = config(dir.path(), DaType::Local);
        roller.store().write(&current).unwrap();
        let before = std::fs::read_to_string(current.config_path()).unwrap();

        assert_eq!(roller.load(dir.path()).unwrap(), current);
        assert_eq!(std::fs::read_to_string(current.config_path()).unwrap(), before);
    }
}
