//! Local DA for development chains. Nothing to run, fund or configure.

use crate::{
    AccountData, DaError, DataAvailabilityProvider, KeyInfo, NodeType, UnderfundedAddress,
    ACTIVE_STATUS,
};
use process_runner::CommandSpec;
use roller_config::DaType;
use std::path::{Path, PathBuf};

pub const NETWORK_NAME: &str = "local";

pub struct Local {
    root: PathBuf,
}

impl Local {
    pub fn new(home: &Path) -> Self {
        Self {
            root: home.to_path_buf(),
        }
    }
}

impl DataAvailabilityProvider for Local {
    fn da_type(&self) -> DaType {
        DaType::Local
    }

    fn initialize_light_node_config(&self) -> Result<String, DaError> {
        Ok(String::new())
    }

    fn get_da_account_address(&self) -> Result<Option<KeyInfo>, DaError> {
        Ok(None)
    }

    fn get_key_name(&self) -> &'static str {
        ""
    }

    fn get_sequencer_da_config(&self, _node_type: NodeType) -> Result<String, DaError> {
        Ok(String::new())
    }

    fn get_namespace_id(&self) -> Option<String> {
        None
    }

    fn restore_namespace_id(&self, _namespace_id: &str) -> bool {
        false
    }

    fn get_da_acc_data(&self) -> Result<Vec<AccountData>, DaError> {
        Ok(Vec::new())
    }

    fn check_da_balance(&self) -> Result<Vec<UnderfundedAddress>, DaError> {
        Ok(Vec::new())
    }

    fn get_status(&self) -> String {
        ACTIVE_STATUS.to_string()
    }

    fn get_light_node_endpoint(&self) -> Result<String, DaError> {
        Ok(String::new())
    }

    fn get_network_name(&self) -> String {
        NETWORK_NAME.to_string()
    }

    fn get_root_directory(&self) -> &Path {
        &self.root
    }

    fn start_command(&self) -> Result<Option<CommandSpec>, DaError> {
        Ok(None)
    }
}
