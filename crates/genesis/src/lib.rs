//! Rollapp genesis download and verification.
//!
//! The hub publishes a genesis URL and a sha256 checksum for every rollapp.
//! A downloaded genesis is only trusted once its declared chain id matches
//! the rollapp being initialized and its checksum matches the hub's record;
//! the two checks are independent and both must pass.

use async_trait::async_trait;
use roller_config::dirs;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur while fetching or verifying a genesis.
#[derive(Error, Debug)]
pub enum GenesisError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("genesis download from {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed genesis: {0}")]
    Malformed(String),
    #[error("genesis chain id mismatch: expected {expected}, got {actual}")]
    ChainIdMismatch { expected: String, actual: String },
    #[error("genesis checksum mismatch: hub recorded {expected}, downloaded file has {actual}")]
    ChecksumMismatch { expected: String, actual: String },
    #[error("token supply is not defined in the genesis file")]
    EmptySupply,
    #[error("invalid base denom {0:?}")]
    InvalidDenom(String),
}

/// What the hub records about a rollapp's genesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubGenesisMetadata {
    pub genesis_url: String,
    /// Hex sha256 of the genesis file.
    pub genesis_checksum: String,
}

/// A supply entry from the bank module's genesis state.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SupplyEntry {
    pub denom: String,
    pub amount: String,
}

#[derive(Deserialize)]
struct GenesisDoc {
    chain_id: String,
    #[serde(default)]
    app_state: AppState,
}

#[derive(Deserialize, Default)]
struct AppState {
    #[serde(default)]
    bank: BankState,
}

#[derive(Deserialize, Default)]
struct BankState {
    #[serde(default)]
    supply: Vec<SupplyEntry>,
}

/// The parts of a verified genesis roller keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenesisDescriptor {
    pub chain_id: String,
    pub supply: Vec<SupplyEntry>,
    /// Denom of the first supply entry, e.g. `urax`.
    pub base_denom: String,
    /// `base_denom` without its exponent prefix, e.g. `rax`.
    pub denom: String,
    pub checksum: String,
}

/// `<home>/rollapp/config/genesis.json`
pub fn genesis_file_path(home: &Path) -> PathBuf {
    home.join(dirs::ROLLAPP).join("config").join("genesis.json")
}

/// Compute the hex sha256 of arbitrary bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Strip the single-character exponent prefix from a base denom.
pub fn display_denom(base_denom: &str) -> Result<String, GenesisError> {
    let mut chars = base_denom.chars();
    match chars.next() {
        Some(_) if !chars.as_str().is_empty() => Ok(chars.as_str().to_string()),
        _ => Err(GenesisError::InvalidDenom(base_denom.to_string())),
    }
}

/// Check a downloaded genesis against the expected chain id and the hub's
/// checksum, then extract its denoms.
pub fn verify_genesis(
    bytes: &[u8],
    expected_chain_id: &str,
    expected_checksum: &str,
) -> Result<GenesisDescriptor, GenesisError> {
    let doc: GenesisDoc =
        serde_json::from_slice(bytes).map_err(|e| GenesisError::Malformed(e.to_string()))?;

    if doc.chain_id != expected_chain_id {
        return Err(GenesisError::ChainIdMismatch {
            expected: expected_chain_id.to_string(),
            actual: doc.chain_id,
        });
    }

    let checksum = sha256_hex(bytes);
    if !checksum.eq_ignore_ascii_case(expected_checksum.trim()) {
        return Err(GenesisError::ChecksumMismatch {
            expected: expected_checksum.to_string(),
            actual: checksum,
        });
    }

    let supply = doc.app_state.bank.supply;
    let base_denom = supply
        .first()
        .map(|entry| entry.denom.clone())
        .ok_or(GenesisError::EmptySupply)?;
    let denom = display_denom(&base_denom)?;

    debug!("Genesis {} verified, base denom {}", doc.chain_id, base_denom);
    Ok(GenesisDescriptor {
        chain_id: doc.chain_id,
        supply,
        base_denom,
        denom,
        checksum,
    })
}

/// Where genesis bytes come from.
#[async_trait]
pub trait GenesisSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, GenesisError>;
}

/// Downloads genesis files over HTTP(S) without authentication.
#[derive(Clone, Default)]
pub struct HttpGenesisSource {
    client: reqwest::Client,
}

impl HttpGenesisSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GenesisSource for HttpGenesisSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, GenesisError> {
        debug!("Downloading genesis from {}", url);
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(GenesisError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> GenesisError {
    let path = path.to_path_buf();
    move |source| GenesisError::Io { path, source }
}

/// Download the genesis, verify it, then move it to its fixed path under
/// `home`.
///
/// The download is staged next to the final file and only renamed into
/// place once verified. A rejected download leaves any existing genesis
/// untouched.
pub async fn fetch_and_verify(
    source: &dyn GenesisSource,
    home: &Path,
    metadata: &HubGenesisMetadata,
    expected_chain_id: &str,
) -> Result<GenesisDescriptor, GenesisError> {
    info!("Fetching genesis for {} from {}", expected_chain_id, metadata.genesis_url);
    let bytes = source.fetch(&metadata.genesis_url).await?;

    let path = genesis_file_path(home);
    let staged = path.with_extension("json.download");
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    std::fs::write(&staged, &bytes).map_err(io_error(&staged))?;

    match verify_genesis(&bytes, expected_chain_id, &metadata.genesis_checksum) {
        Ok(descriptor) => {
            std::fs::rename(&staged, &path).map_err(io_error(&path))?;
            info!("Genesis verified, checksum {}", descriptor.checksum);
            Ok(descriptor)
        }
        Err(e) => {
            warn!("Discarding unverified genesis from {}: {}", metadata.genesis_url, e);
            std::fs::remove_file(&staged).map_err(io_error(&staged))?;
            Err(e)
        }
    }
}
