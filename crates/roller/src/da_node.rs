//! DA light node status and start.

use crate::{Roller, RollerError};
use da_layer::{new_provider, Celestia, DataAvailabilityProvider};
use roller_config::{dirs, fs, DaType, RollappConfig};
use std::path::PathBuf;
use tracing::info;

pub const LIGHT_CLIENT_LOG: &str = "da-light-client.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaStatus {
    pub backend: DaType,
    pub network: String,
    pub status: String,
}

/// `<home>/logs/da-light-client.log`
pub fn light_client_log_path(config: &RollappConfig) -> PathBuf {
    config.home.join(dirs::LOGS).join(LIGHT_CLIENT_LOG)
}

impl Roller {
    /// Never fails; an unreachable backend reports a degraded status.
    pub fn da_status(&self, config: &RollappConfig) -> DaStatus {
        let provider = new_provider(config.da.backend, config, self.runner());
        DaStatus {
            backend: provider.da_type(),
            network: provider.get_network_name(),
            status: provider.get_status(),
        }
    }

    /// Launch the backend's light node in the background.
    ///
    /// Returns the pid, or `None` for backends without a light node. The
    /// process is not supervised once started.
    pub fn start_da_light_node(
        &self,
        config: &RollappConfig,
        metrics_endpoint: Option<&str>,
    ) -> Result<Option<u32>, RollerError> {
        let provider: Box<dyn DataAvailabilityProvider> = match config.da.backend {
            DaType::Celestia => {
                let mut celestia = Celestia::new(config, self.runner());
                if let Some(endpoint) = metrics_endpoint {
                    celestia.set_metrics_endpoint(endpoint);
                }
                Box::new(celestia)
            }
            backend => new_provider(backend, config, self.runner()),
        };

        let Some(cmd) = provider.start_command()? else {
            info!("{} DA has no light node to start", config.da.backend);
            return Ok(None);
        };

        let log_file = light_client_log_path(config);
        if let Some(parent) = log_file.parent() {
            fs::create_dir_all(parent)?;
        }
        let pid = self.runner().spawn_detached(&cmd, &log_file)?;
        info!(
            "Started {} light node (pid {}), logs at {}",
            config.da.backend,
            pid,
            log_file.display()
        );
        Ok(Some(pid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{config, roller};
    use process_runner::testing::ScriptedRunner;
    use std::sync::Arc;

    #[test]
    fn test_status_never_fails() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        runner.fail("celestia", &["state", "balance"], "connection refused");
        let roller = roller(&runner);

        let status = roller.da_status(&config(dir.path(), DaType::Celestia));
        assert_eq!(status.status, da_layer::UNHEALTHY_STATUS);
        assert_eq!(status.network, "mocha-4");

        let local = roller.da_status(&config(dir.path(), DaType::Local));
        assert_eq!(local.backend, DaType::Local);
    }

    #[test]
    fn test_start_celestia_with_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let roller = roller(&runner);
        let cfg = config(dir.path(), DaType::Celestia);

        let pid = roller
            .start_da_light_node(&cfg, Some("otel.example:4318"))
            .unwrap();

        assert_eq!(pid, Some(4242));
        assert!(dir.path().join("logs").is_dir());
        let cmd = &runner.calls_to("celestia")[0];
        assert_eq!(&cmd.args[..2], &["light", "start"]);
        assert!(cmd.args.ends_with(&[
            "--metrics".to_string(),
            "--metrics.endpoint".to_string(),
            "otel.example:4318".to_string()
        ]));
    }

    #[test]
    fn test_start_without_light_node() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let roller = roller(&runner);

        for backend in [DaType::Avail, DaType::Local] {
            assert_eq!(
                roller
                    .start_da_light_node(&config(dir.path(), backend), None)
                    .unwrap(),
                None
            );
        }
        assert!(runner.calls().is_empty());
    }
}
