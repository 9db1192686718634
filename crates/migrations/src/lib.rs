//! Version-gated migrations of `roller.toml` and the files it points at.
//!
//! Migrators are registered in ascending version order. Each one decides
//! from the version recorded in the config whether it applies, and persists
//! whatever it changed before returning. Once all applicable migrators ran,
//! the engine records the running tool version so later runs skip them.

use da_layer::DaError;
use process_runner::ProcessRunner;
use roller_config::{ConfigError, ConfigStore, RollappConfig};
use std::cmp::Ordering;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

mod v0_1_12;
mod version;

pub use v0_1_12::VersionMigratorV0112;
pub use version::VersionData;

/// Version of this build, stamped into migrated configs.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Errors that can occur while migrating.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("DA error: {0}")]
    Da(#[from] DaError),
    #[error("invalid version {0:?}")]
    InvalidVersion(String),
    #[error("migration {name} failed: {source}")]
    Failed {
        name: &'static str,
        #[source]
        source: Box<MigrationError>,
    },
}

/// Collaborators a migrator may use.
pub struct MigrationContext<'a> {
    pub store: &'a dyn ConfigStore,
    pub runner: Arc<dyn ProcessRunner>,
}

/// One forward transformation of the persisted configuration.
///
/// `perform_migration` must be idempotent and must persist the config
/// through `ctx.store` if it changed it.
pub trait VersionMigrator {
    fn name(&self) -> &'static str;

    /// Whether a config last written by `previous` needs this migration.
    fn should_migrate(&self, previous: &VersionData) -> bool;

    fn perform_migration(
        &self,
        config: &mut RollappConfig,
        ctx: &MigrationContext<'_>,
    ) -> Result<(), MigrationError>;
}

/// Version recorded in `config`. Configs from before versions were recorded
/// count as `0.0.0`.
pub fn recorded_version(config: &RollappConfig) -> Result<VersionData, MigrationError> {
    if config.roller_version.trim().is_empty() {
        return Ok(VersionData::default());
    }
    config.roller_version.parse()
}

/// Runs registered migrators in order.
pub struct MigrationEngine {
    current: VersionData,
    migrators: Vec<Box<dyn VersionMigrator>>,
}

impl MigrationEngine {
    /// Engine with every known migrator.
    pub fn new(current: VersionData) -> Self {
        Self::with_migrators(current, vec![Box::new(VersionMigratorV0112)])
    }

    pub fn with_migrators(current: VersionData, migrators: Vec<Box<dyn VersionMigrator>>) -> Self {
        Self { current, migrators }
    }

    /// Apply every migrator whose predicate holds for the recorded version.
    ///
    /// Returns the names of the migrators that ran. A failure stops the run
    /// with earlier migrations already persisted; re-running resumes since
    /// every migrator is idempotent.
    pub fn run(
        &self,
        config: &mut RollappConfig,
        ctx: &MigrationContext<'_>,
    ) -> Result<Vec<&'static str>, MigrationError> {
        let previous = recorded_version(config)?;

        match previous.cmp(&self.current) {
            Ordering::Equal => {
                debug!("Config is at version {}, nothing to migrate", previous);
                return Ok(Vec::new());
            }
            Ordering::Greater => {
                warn!(
                    "Config was written by roller {} which is newer than {}",
                    previous, self.current
                );
                return Ok(Vec::new());
            }
            Ordering::Less => {}
        }

        let mut applied = Vec::new();
        for migrator in &self.migrators {
            if !migrator.should_migrate(&previous) {
                debug!("Skipping migration {} for {}", migrator.name(), previous);
                continue;
            }
            info!("Running migration {} from {}", migrator.name(), previous);
            migrator
                .perform_migration(config, ctx)
                .map_err(|e| MigrationError::Failed {
                    name: migrator.name(),
                    source: Box::new(e),
                })?;
            applied.push(migrator.name());
        }

        config.roller_version = self.current.to_string();
        ctx.store.write(config)?;
        info!("Config version set to {}", self.current);
        Ok(applied)
    }
}
