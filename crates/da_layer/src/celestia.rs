//! Celestia backend driven through the `celestia` light node, `cel-key` and
//! `celestia-appd` binaries.

use crate::balance::BankBalancesResponse;
use crate::sequencer_config::CelestiaDaConfig;
use crate::{
    run_json, AccountData, DaError, DataAvailabilityProvider, KeyInfo, NodeType,
    UnderfundedAddress, ACTIVE_STATUS, UNHEALTHY_STATUS,
};
use num_bigint::BigUint;
use process_runner::{CommandSpec, ProcessRunner};
use roller_config::{dirs, get_key_from_toml, DaType, RollappConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

pub const CELESTIA_BINARY: &str = "celestia";
pub const CEL_KEY_BINARY: &str = "cel-key";
pub const CELESTIA_APP_BINARY: &str = "celestia-appd";

/// Key name of the light node's funding account.
pub const KEY_NAME: &str = "my_celes_key";
pub const DENOM: &str = "utia";
pub const DEFAULT_NETWORK: &str = "mocha-4";

/// Minimum light node balance, in utia.
pub const MIN_BALANCE: u64 = 1;

/// Random bytes in a generated namespace id.
pub const NAMESPACE_ID_LEN: usize = 10;

/// Line that precedes the mnemonic in `celestia light init` output.
const MNEMONIC_MARKER: &str = "MNEMONIC";

/// Celestia light node bound to `<home>/da-light-node`.
pub struct Celestia {
    root: PathBuf,
    network_id: String,
    rpc_url: String,
    state_node: String,
    metrics_endpoint: Option<String>,
    runner: Arc<dyn ProcessRunner>,
    rpc_port: OnceLock<String>,
    namespace_id: OnceLock<String>,
}

#[derive(Deserialize)]
struct StateBalanceResponse {
    result: crate::balance::Coin,
}

impl Celestia {
    pub fn new(config: &RollappConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            root: config.home.clone(),
            network_id: config.da.id.clone(),
            rpc_url: config.da.rpc_url.clone(),
            state_node: config.da.state_node.clone(),
            metrics_endpoint: None,
            runner,
            rpc_port: OnceLock::new(),
            namespace_id: OnceLock::new(),
        }
    }

    /// Have the light node export metrics to `endpoint` when started.
    pub fn set_metrics_endpoint(&mut self, endpoint: impl Into<String>) {
        self.metrics_endpoint = Some(endpoint.into());
    }

    /// `<home>/da-light-node`
    pub fn light_node_dir(&self) -> PathBuf {
        self.root.join(dirs::DA_LIGHT_NODE)
    }

    /// `<home>/da-light-node/keys`
    pub fn keys_dir(&self) -> PathBuf {
        self.light_node_dir().join(dirs::KEYS)
    }

    /// `<home>/da-light-node/config.toml`
    pub fn light_node_config_path(&self) -> PathBuf {
        self.light_node_dir().join("config.toml")
    }

    fn network(&self) -> &str {
        if self.network_id.is_empty() {
            DEFAULT_NETWORK
        } else {
            &self.network_id
        }
    }

    /// Light node RPC port, read from its config on first use.
    pub fn rpc_port(&self) -> Result<String, DaError> {
        if let Some(port) = self.rpc_port.get() {
            return Ok(port.clone());
        }
        let path = self.light_node_config_path();
        let port = get_key_from_toml(&path, "RPC.Port").map_err(|source| {
            DaError::RpcPortUnresolved {
                path: path.display().to_string(),
                source,
            }
        })?;
        debug!("Resolved celestia light node RPC port {}", port);
        Ok(self.rpc_port.get_or_init(|| port).clone())
    }

    fn auth_token(&self, node_type: NodeType) -> Result<String, DaError> {
        let cmd = CommandSpec::new(CELESTIA_BINARY)
            .args(["light", "auth", node_type.auth_token_type()])
            .args(["--p2p.network", self.network()])
            .arg("--node.store")
            .path_arg(self.light_node_dir());
        let output = self.runner.run(&cmd)?;
        Ok(output.stdout.trim_end_matches('\n').to_string())
    }

    /// Hex encoded private key of the light node account.
    pub fn export_private_key(&self) -> Result<String, DaError> {
        let cmd = CommandSpec::new(CEL_KEY_BINARY)
            .args(["export", KEY_NAME, "--keyring-backend", "test"])
            .arg("--keyring-dir")
            .path_arg(self.keys_dir())
            .args(["--unarmored-hex", "--unsafe"]);
        let output = self.runner.run(&cmd)?;
        Ok(output.stdout.trim().to_string())
    }
}

/// Collect every line after the first `MNEMONIC` marker line.
pub fn extract_mnemonic(output: &str) -> String {
    output
        .lines()
        .skip_while(|line| !line.starts_with(MNEMONIC_MARKER))
        .skip(1)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn generate_namespace_id() -> String {
    hex::encode(rand::random::<[u8; NAMESPACE_ID_LEN]>())
}

impl DataAvailabilityProvider for Celestia {
    fn da_type(&self) -> DaType {
        DaType::Celestia
    }

    fn initialize_light_node_config(&self) -> Result<String, DaError> {
        let cmd = CommandSpec::new(CELESTIA_BINARY)
            .args(["light", "init", "--p2p.network", self.network()])
            .arg("--node.store")
            .path_arg(self.light_node_dir());
        info!("Initializing celestia light node in {}", self.light_node_dir().display());
        let output = self.runner.run(&cmd)?;

        let mnemonic = extract_mnemonic(&output.stdout);
        if mnemonic.is_empty() {
            warn!("celestia light init printed no mnemonic");
        }
        Ok(mnemonic)
    }

    fn get_da_account_address(&self) -> Result<Option<KeyInfo>, DaError> {
        let cmd = CommandSpec::new(CEL_KEY_BINARY)
            .args(["show", KEY_NAME, "--node.type", "light", "--keyring-dir"])
            .path_arg(self.keys_dir())
            .args(["--keyring-backend", "test", "--output", "json"]);
        let key: KeyInfo = run_json(self.runner.as_ref(), &cmd)?;
        if key.address.is_empty() {
            return Err(DaError::invalid_response(CEL_KEY_BINARY, "empty address"));
        }
        Ok(Some(key))
    }

    fn get_key_name(&self) -> &'static str {
        KEY_NAME
    }

    fn get_sequencer_da_config(&self, node_type: NodeType) -> Result<String, DaError> {
        let namespace_id = self.namespace_id.get_or_init(generate_namespace_id).clone();
        let base_url = self.get_light_node_endpoint()?;
        let auth_token = self.auth_token(node_type)?;
        Ok(CelestiaDaConfig::new(base_url, namespace_id, auth_token).to_json())
    }

    fn get_namespace_id(&self) -> Option<String> {
        self.namespace_id.get().cloned()
    }

    fn restore_namespace_id(&self, namespace_id: &str) -> bool {
        self.namespace_id.set(namespace_id.to_string()).is_ok()
    }

    fn get_da_acc_data(&self) -> Result<Vec<AccountData>, DaError> {
        let key = self
            .get_da_account_address()?
            .ok_or_else(|| DaError::invalid_response(CEL_KEY_BINARY, "no key"))?;

        let cmd = CommandSpec::new(CELESTIA_APP_BINARY)
            .args(["q", "bank", "balances", key.address.as_str()])
            .args(["--node", self.rpc_url.as_str()])
            .args(["--chain-id", self.network(), "-o", "json"]);
        let resp: BankBalancesResponse = run_json(self.runner.as_ref(), &cmd)?;
        let balance = resp
            .balance_of(DENOM)
            .map_err(|e| DaError::invalid_response(CELESTIA_APP_BINARY, e))?;

        Ok(vec![AccountData {
            address: key.address,
            balance,
        }])
    }

    fn check_da_balance(&self) -> Result<Vec<UnderfundedAddress>, DaError> {
        let required = BigUint::from(MIN_BALANCE);
        Ok(self
            .get_da_acc_data()?
            .into_iter()
            .filter(|acc| acc.balance < required)
            .map(|acc| UnderfundedAddress {
                key_name: KEY_NAME.to_string(),
                address: acc.address,
                current_balance: acc.balance,
                required_balance: required.clone(),
                denom: DENOM.to_string(),
                network: self.network().to_string(),
            })
            .collect())
    }

    fn get_status(&self) -> String {
        let cmd = CommandSpec::new(CELESTIA_BINARY)
            .args(["state", "balance", "--node.store"])
            .path_arg(self.light_node_dir());
        match run_json::<StateBalanceResponse>(self.runner.as_ref(), &cmd) {
            Ok(resp) => {
                debug!("celestia light node balance: {} {}", resp.result.amount, resp.result.denom);
                ACTIVE_STATUS.to_string()
            }
            Err(e) => {
                debug!("celestia status query failed: {}", e);
                UNHEALTHY_STATUS.to_string()
            }
        }
    }

    fn get_light_node_endpoint(&self) -> Result<String, DaError> {
        Ok(format!("http://localhost:{}", self.rpc_port()?))
    }

    fn get_network_name(&self) -> String {
        self.network().to_string()
    }

    fn get_root_directory(&self) -> &Path {
        &self.root
    }

    fn start_command(&self) -> Result<Option<CommandSpec>, DaError> {
        let mut cmd = CommandSpec::new(CELESTIA_BINARY)
            .args(["light", "start", "--core.ip", self.state_node.as_str()])
            .arg("--node.store")
            .path_arg(self.light_node_dir())
            .args(["--gateway", "--p2p.network", self.network()]);
        if let Some(endpoint) = &self.metrics_endpoint {
            cmd = cmd.args(["--metrics", "--metrics.endpoint", endpoint.as_str()]);
        }
        Ok(Some(cmd))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use process_runner::testing::ScriptedRunner;
    use roller_config::DaConfig;

    const INIT_OUTPUT: &str = "2024-01-01 INFO node initialized\n\
        NAME: my_celes_key\n\
        ADDRESS: celestia1abc\n\
        MNEMONIC (save this somewhere safe!!!):\n\
        bottom drive obey lake curtain smoke basket hold race lonely fit walk\n";

    fn setup(runner: Arc<ScriptedRunner>) -> (tempfile::TempDir, Celestia) {
        let dir = tempfile::tempdir().unwrap();
        let config = RollappConfig {
            home: dir.path().to_path_buf(),
            da: DaConfig {
                backend: DaType::Celestia,
                id: "mocha-4".to_string(),
                rpc_url: "http://consensus:26657".to_string(),
                state_node: "rpc-mocha.pops.one".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let node_dir = dir.path().join(dirs::DA_LIGHT_NODE);
        std::fs::create_dir_all(&node_dir).unwrap();
        std::fs::write(
            node_dir.join("config.toml"),
            "[RPC]\n  Address = \"0.0.0.0\"\n  Port = \"26658\"\n",
        )
        .unwrap();
        let celestia = Celestia::new(&config, runner);
        (dir, celestia)
    }

    #[test]
    fn test_extract_mnemonic() {
        assert_eq!(
            extract_mnemonic(INIT_OUTPUT),
            "bottom drive obey lake curtain smoke basket hold race lonely fit walk"
        );
        assert_eq!(extract_mnemonic("no marker here\n"), "");
        assert_eq!(
            extract_mnemonic("MNEMONIC:\nword1 word2\nword3\n"),
            "word1 word2 word3"
        );
    }

    #[test]
    fn test_initialize_light_node_config() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.on(CELESTIA_BINARY, &["light", "init"], INIT_OUTPUT);
        let (_dir, celestia) = setup(Arc::clone(&runner));

        let mnemonic = celestia.initialize_light_node_config().unwrap();
        assert!(mnemonic.starts_with("bottom drive obey"));

        let call = &runner.calls_to(CELESTIA_BINARY)[0];
        assert!(call.args.contains(&"mocha-4".to_string()));
    }

    #[test]
    fn test_initialize_without_marker_is_not_fatal() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.on(CELESTIA_BINARY, &["light", "init"], "initialized\n");
        let (_dir, celestia) = setup(runner);
        assert_eq!(celestia.initialize_light_node_config().unwrap(), "");
    }

    #[test]
    fn test_initialize_failure_propagates() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.fail(CELESTIA_BINARY, &["light", "init"], "bad network");
        let (_dir, celestia) = setup(runner);
        assert!(matches!(
            celestia.initialize_light_node_config(),
            Err(DaError::Process(_))
        ));
    }

    #[test]
    fn test_account_address() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.on(
            CEL_KEY_BINARY,
            &["show", KEY_NAME],
            r#"{"name":"my_celes_key","type":"local","address":"celestia1xyz","pubkey":"{}"}"#,
        );
        let (_dir, celestia) = setup(runner);
        let key = celestia.get_da_account_address().unwrap().unwrap();
        assert_eq!(key.name, KEY_NAME);
        assert_eq!(key.address, "celestia1xyz");
    }

    #[test]
    fn test_account_address_unparsable() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.on(CEL_KEY_BINARY, &["show"], "not json");
        let (_dir, celestia) = setup(runner);
        assert!(matches!(
            celestia.get_da_account_address(),
            Err(DaError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_rpc_port_is_memoized() {
        let runner = Arc::new(ScriptedRunner::new());
        let (dir, celestia) = setup(runner);

        assert_eq!(celestia.get_light_node_endpoint().unwrap(), "http://localhost:26658");
        // later edits are not picked up by the same instance
        std::fs::write(
            dir.path().join(dirs::DA_LIGHT_NODE).join("config.toml"),
            "[RPC]\n  Port = \"1111\"\n",
        )
        .unwrap();
        assert_eq!(celestia.get_light_node_endpoint().unwrap(), "http://localhost:26658");
    }

    #[test]
    fn test_rpc_port_unresolved_is_error() {
        let runner = Arc::new(ScriptedRunner::new());
        let (dir, celestia) = setup(runner);
        std::fs::remove_file(dir.path().join(dirs::DA_LIGHT_NODE).join("config.toml")).unwrap();
        assert!(matches!(
            celestia.get_light_node_endpoint(),
            Err(DaError::RpcPortUnresolved { .. })
        ));
    }

    #[test]
    fn test_sequencer_da_config_namespace_is_stable_per_instance() {
        let runner = Arc::new(ScriptedRunner::new());
        runner
            .on(CELESTIA_BINARY, &["light", "auth", "admin"], "admin-token\n")
            .on(CELESTIA_BINARY, &["light", "auth", "read"], "read-token\n");
        let (dir, first) = setup(Arc::clone(&runner));

        let a: serde_json::Value =
            serde_json::from_str(&first.get_sequencer_da_config(NodeType::Sequencer).unwrap())
                .unwrap();
        let b: serde_json::Value =
            serde_json::from_str(&first.get_sequencer_da_config(NodeType::Sequencer).unwrap())
                .unwrap();
        assert_eq!(a["namespace_id"], b["namespace_id"]);
        assert_eq!(a["namespace_id"].as_str().unwrap().len(), NAMESPACE_ID_LEN * 2);
        assert_eq!(a["auth_token"], "admin-token");
        assert_eq!(a["base_url"], "http://localhost:26658");

        let full: serde_json::Value =
            serde_json::from_str(&first.get_sequencer_da_config(NodeType::FullNode).unwrap())
                .unwrap();
        assert_eq!(full["auth_token"], "read-token");
        assert_eq!(full["namespace_id"], a["namespace_id"]);

        let config = RollappConfig {
            home: dir.path().to_path_buf(),
            ..Default::default()
        };
        let second = Celestia::new(&config, runner);
        let c: serde_json::Value =
            serde_json::from_str(&second.get_sequencer_da_config(NodeType::Sequencer).unwrap())
                .unwrap();
        assert_ne!(a["namespace_id"], c["namespace_id"]);
    }

    #[test]
    fn test_restore_namespace_id() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.on(CELESTIA_BINARY, &["light", "auth"], "t\n");
        let (_dir, celestia) = setup(runner);

        assert!(celestia.restore_namespace_id("feedface"));
        assert!(!celestia.restore_namespace_id("other"));
        let blob = celestia.get_sequencer_da_config(NodeType::Sequencer).unwrap();
        assert!(blob.contains(r#""namespace_id":"feedface""#));
    }

    #[test]
    fn test_check_da_balance() {
        let runner = Arc::new(ScriptedRunner::new());
        runner
            .on(CEL_KEY_BINARY, &["show"], r#"{"name":"my_celes_key","address":"celestia1xyz"}"#)
            .on(CELESTIA_APP_BINARY, &["q", "bank", "balances"], r#"{"balances":[]}"#);
        let (_dir, celestia) = setup(Arc::clone(&runner));

        let underfunded = celestia.check_da_balance().unwrap();
        assert_eq!(underfunded.len(), 1);
        assert_eq!(underfunded[0].address, "celestia1xyz");
        assert_eq!(underfunded[0].required_balance, BigUint::from(1u32));
        assert_eq!(underfunded[0].current_balance, BigUint::default());
        assert_eq!(underfunded[0].network, "mocha-4");

        let query = &runner.calls_to(CELESTIA_APP_BINARY)[0];
        assert!(query.args.contains(&"http://consensus:26657".to_string()));
    }

    #[test]
    fn test_check_da_balance_funded() {
        let runner = Arc::new(ScriptedRunner::new());
        runner
            .on(CEL_KEY_BINARY, &["show"], r#"{"name":"my_celes_key","address":"celestia1xyz"}"#)
            .on(
                CELESTIA_APP_BINARY,
                &["q"],
                r#"{"balances":[{"denom":"utia","amount":"5"}]}"#,
            );
        let (_dir, celestia) = setup(runner);
        assert!(celestia.check_da_balance().unwrap().is_empty());
    }

    #[test]
    fn test_status_collapses_failures() {
        let runner = Arc::new(ScriptedRunner::new());
        let (_dir, celestia) = setup(Arc::clone(&runner));
        assert_eq!(celestia.get_status(), UNHEALTHY_STATUS);

        runner.on(
            CELESTIA_BINARY,
            &["state", "balance"],
            r#"{"result":{"denom":"utia","amount":"10"}}"#,
        );
        assert_eq!(celestia.get_status(), ACTIVE_STATUS);
    }

    #[test]
    fn test_start_command_with_metrics() {
        let runner = Arc::new(ScriptedRunner::new());
        let (_dir, mut celestia) = setup(runner);
        celestia.set_metrics_endpoint("otel:4318");

        let cmd = celestia.start_command().unwrap().unwrap();
        assert_eq!(cmd.program, CELESTIA_BINARY);
        assert_eq!(&cmd.args[..4], &["light", "start", "--core.ip", "rpc-mocha.pops.one"]);
        assert!(cmd.args.ends_with(&[
            "--metrics".to_string(),
            "--metrics.endpoint".to_string(),
            "otel:4318".to_string()
        ]));
    }
}
