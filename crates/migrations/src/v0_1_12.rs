use crate::{MigrationContext, MigrationError, VersionData, VersionMigrator};
use da_layer::sequencer_config::restore_namespace_from_dymint;
use da_layer::{avail, new_provider, NodeType};
use roller_config::{fs, update_field_in_toml, DaType, RollappConfig};
use std::sync::Arc;
use tracing::{debug, info};

const TARGET: VersionData = VersionData::new(0, 1, 12);

/// 0.1.12 renamed the `mock` DA to `local`, moved `avail.toml` under the
/// light node directory and changed the sequencer DA config layout.
pub struct VersionMigratorV0112;

impl VersionMigrator for VersionMigratorV0112 {
    fn name(&self) -> &'static str {
        "v0.1.12"
    }

    fn should_migrate(&self, previous: &VersionData) -> bool {
        *previous < TARGET
    }

    fn perform_migration(
        &self,
        config: &mut RollappConfig,
        ctx: &MigrationContext<'_>,
    ) -> Result<(), MigrationError> {
        if config.da.backend == DaType::Mock {
            info!("Renaming DA backend mock to local");
            config.da.backend = DaType::Local;
            ctx.store.write(config)?;
            return Ok(());
        }

        if config.da.backend == DaType::Avail {
            let legacy = avail::legacy_cfg_file_path(&config.home);
            if legacy.exists() {
                let target = avail::cfg_file_path(&config.home);
                info!("Moving {} to {}", legacy.display(), target.display());
                fs::move_file(&legacy, &target)?;
            }
        }

        let provider = new_provider(config.da.backend, config, Arc::clone(&ctx.runner));
        let dymint = config.dymint_config_path();
        restore_namespace_from_dymint(provider.as_ref(), &dymint);

        let da_config = provider.get_sequencer_da_config(NodeType::Sequencer)?;
        if da_config.is_empty() {
            debug!("{} needs no sequencer DA config", config.da.backend);
            return Ok(());
        }
        update_field_in_toml(&dymint, "da_config", da_config)?;
        ctx.store.write(config)?;
        Ok(())
    }
}
