//! `roller config set da`: replace the DA backend of an initialized rollapp.
//!
//! The switch is not transactional. If anything fails after the old light
//! node directory is removed, the operator re-runs the command; with the
//! directory already gone no confirmation is asked the second time.

use crate::{sequencer, Confirm, Roller, RollerError};
use da_layer::{default_da_config, new_provider, KeyInfo};
use roller_config::{fs, DaType, RollappConfig};
use tracing::{info, warn};

pub const SWITCH_PROMPT: &str =
    "Changing DA will remove the old DA keys permanently. Are you sure you want to proceed";

/// Result of a `set da` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetDaOutcome {
    /// The requested backend is already selected.
    Unchanged,
    /// The operator declined deleting the old DA keys. Nothing was changed.
    Declined,
    Switched {
        backend: DaType,
        mnemonic: String,
        /// Address the operator must fund before starting the light node.
        fund: Option<KeyInfo>,
    },
}

impl Roller {
    /// Switch `config` to the backend named by `requested`.
    pub fn set_da(
        &self,
        config: &mut RollappConfig,
        requested: &str,
        confirm: &dyn Confirm,
    ) -> Result<SetDaOutcome, RollerError> {
        let backend = match requested.parse::<DaType>() {
            Ok(backend) if backend == config.da.backend => return Ok(SetDaOutcome::Unchanged),
            Ok(backend) if backend.is_supported() => backend,
            _ => return Err(RollerError::UnsupportedDa(requested.to_string())),
        };

        let da_dir = config.da_light_node_dir();
        if fs::dir_not_empty(&da_dir)? {
            let approved = confirm.confirm(SWITCH_PROMPT).map_err(RollerError::Prompt)?;
            if !approved {
                info!("DA switch to {} declined", backend);
                return Ok(SetDaOutcome::Declined);
            }
        }
        fs::remove_dir_all(&da_dir)?;
        info!("Removed {} light node at {}", config.da.backend, da_dir.display());

        let mut next = config.clone();
        next.da = default_da_config(backend);
        let provider = new_provider(backend, &next, self.runner());
        let mnemonic = provider.initialize_light_node_config()?;
        sequencer::update_dymint_da_config(&next, provider.as_ref())?;
        let fund = provider.get_da_account_address().unwrap_or_else(|e| {
            warn!("Could not read the new {} DA address: {}", backend, e);
            None
        });
        self.store().write(&next)?;
        *config = next;
        info!("RollApp DA has been successfully set to '{}'", backend);

        Ok(SetDaOutcome::Switched {
            backend,
            mnemonic,
            fund,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{config, roller, Answer};
    use process_runner::testing::ScriptedRunner;
    use roller_config::get_key_from_toml;
    use std::sync::Arc;

    const SUBKEY: &str = r#"{"secretPhrase":"bottom drive obey lake","ss58Address":"5Gabc"}"#;

    fn avail_runner() -> Arc<ScriptedRunner> {
        let runner = Arc::new(ScriptedRunner::new());
        runner
            .on("subkey", &["generate"], SUBKEY)
            .on("subkey", &["inspect"], SUBKEY);
        runner
    }

    #[test]
    fn test_switch_from_empty_dir_needs_no_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let runner = avail_runner();
        let roller = roller(&runner);
        let mut cfg = config(dir.path(), DaType::Local);

        let outcome = roller.set_da(&mut cfg, "avail", &Answer(false)).unwrap();

        match outcome {
            SetDaOutcome::Switched {
                backend,
                mnemonic,
                fund,
            } => {
                assert_eq!(backend, DaType::Avail);
                assert_eq!(mnemonic, "bottom drive obey lake");
                assert_eq!(fund.unwrap().name, "my_avail_key");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        let stored = roller.store().load(dir.path()).unwrap();
        assert_eq!(stored.da.backend, DaType::Avail);
        assert_eq!(stored.da.id, "goldberg");
        assert_eq!(
            get_key_from_toml(&stored.dymint_config_path(), "da_layer").unwrap(),
            "avail"
        );
    }

    #[test]
    fn test_declined_switch_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let runner = avail_runner();
        let roller = roller(&runner);
        let mut cfg = config(dir.path(), DaType::Celestia);
        std::fs::create_dir_all(cfg.da_light_node_dir().join("keys")).unwrap();

        let outcome = roller.set_da(&mut cfg, "avail", &Answer(false)).unwrap();

        assert_eq!(outcome, SetDaOutcome::Declined);
        assert_eq!(cfg.da.backend, DaType::Celestia);
        assert!(cfg.da_light_node_dir().join("keys").exists());
        assert!(!cfg.config_path().exists());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_confirmed_switch_removes_old_keys() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let roller = roller(&runner);
        let mut cfg = config(dir.path(), DaType::Celestia);
        let old_key = cfg.da_light_node_dir().join("keys").join("my_celes_key.info");
        std::fs::create_dir_all(old_key.parent().unwrap()).unwrap();
        std::fs::write(&old_key, "key").unwrap();

        let outcome = roller.set_da(&mut cfg, "local", &Answer(true)).unwrap();

        assert!(matches!(
            outcome,
            SetDaOutcome::Switched {
                backend: DaType::Local,
                fund: None,
                ..
            }
        ));
        assert!(!cfg.da_light_node_dir().exists());
        assert_eq!(
            roller.store().load(dir.path()).unwrap().da.backend,
            DaType::Local
        );
    }

    #[test]
    fn test_same_backend_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let roller = roller(&runner);
        let mut cfg = config(dir.path(), DaType::Avail);
        std::fs::create_dir_all(cfg.da_light_node_dir()).unwrap();
        std::fs::write(cfg.da_light_node_dir().join("avail.toml"), "").unwrap();

        assert_eq!(
            roller.set_da(&mut cfg, "Avail", &Answer(true)).unwrap(),
            SetDaOutcome::Unchanged
        );
        assert!(cfg.da_light_node_dir().join("avail.toml").exists());
    }

    #[test]
    fn test_unknown_and_legacy_backends_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let roller = roller(&runner);
        let mut cfg = config(dir.path(), DaType::Local);

        for requested in ["bitcoin", "mock", ""] {
            assert!(matches!(
                roller.set_da(&mut cfg, requested, &Answer(true)),
                Err(RollerError::UnsupportedDa(_))
            ));
        }
    }

    #[test]
    fn test_address_lookup_failure_still_reports_mnemonic() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        runner
            .on("subkey", &["generate"], SUBKEY)
            .fail("subkey", &["inspect"], "invalid seed");
        let roller = roller(&runner);
        let mut cfg = config(dir.path(), DaType::Local);

        let outcome = roller.set_da(&mut cfg, "avail", &Answer(true)).unwrap();

        assert_eq!(
            outcome,
            SetDaOutcome::Switched {
                backend: DaType::Avail,
                mnemonic: "bottom drive obey lake".to_string(),
                fund: None,
            }
        );
        assert_eq!(cfg.da.backend, DaType::Avail);
        assert_eq!(
            roller.store().load(dir.path()).unwrap().da.backend,
            DaType::Avail
        );
    }

    #[test]
    fn test_failed_init_after_removal_leaves_config() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        runner.fail("celestia", &["light", "init"], "bad network");
        let roller = roller(&runner);
        let mut cfg = config(dir.path(), DaType::Avail);
        roller.store().write(&cfg).unwrap();
        std::fs::create_dir_all(cfg.da_light_node_dir()).unwrap();
        std::fs::write(cfg.da_light_node_dir().join("avail.toml"), "").unwrap();

        assert!(roller.set_da(&mut cfg, "celestia", &Answer(true)).is_err());
        assert_eq!(cfg.da.backend, DaType::Avail);
        assert_eq!(
            roller.store().load(dir.path()).unwrap().da.backend,
            DaType::Avail
        );
        assert!(!cfg.da_light_node_dir().join("avail.toml").exists());
    }
}
