//! DA config blobs embedded in the sequencer's `dymint.toml`.
//!
//! The sequencer reads `da_config` as an opaque JSON string whose exact
//! layout older sequencer builds depend on, so the blobs are rendered by
//! hand from structured values rather than through a serializer.

use crate::DataAvailabilityProvider;
use roller_config::get_key_from_toml;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Exponential backoff between DA submission retries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub growth_factor: u32,
}

/// Timeout and retry behaviour of the sequencer's DA client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub backoff: Backoff,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            backoff: Backoff {
                initial_delay: Duration::from_secs(6),
                max_delay: Duration::from_secs(6),
                growth_factor: 2,
            },
            retry_attempts: 4,
            retry_delay: Duration::from_secs(3),
        }
    }
}

/// Gas settings for blob submission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasSettings {
    pub gas_prices: f64,
    pub gas_adjustment: f64,
}

impl Default for GasSettings {
    fn default() -> Self {
        Self {
            gas_prices: 0.02,
            gas_adjustment: 1.3,
        }
    }
}

/// Sequencer DA config for the Celestia backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CelestiaDaConfig {
    pub base_url: String,
    pub namespace_id: String,
    pub auth_token: String,
    pub gas: GasSettings,
    pub retry: RetryPolicy,
}

impl CelestiaDaConfig {
    pub fn new(base_url: String, namespace_id: String, auth_token: String) -> Self {
        Self {
            base_url,
            namespace_id,
            auth_token,
            gas: GasSettings::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Render the JSON blob dymint expects.
    pub fn to_json(&self) -> String {
        format!(
            r#"{{"base_url": {}, "timeout": {}, "gas_prices":{}, "gas_adjustment": {}, "namespace_id":{},"auth_token":{},"backoff":{{"initial_delay":{},"max_delay":{},"growth_factor":{}}},"retry_attempts":{},"retry_delay":{}}}"#,
            quote(&self.base_url),
            self.retry.timeout.as_nanos(),
            self.gas.gas_prices,
            self.gas.gas_adjustment,
            quote(&self.namespace_id),
            quote(&self.auth_token),
            self.retry.backoff.initial_delay.as_nanos(),
            self.retry.backoff.max_delay.as_nanos(),
            self.retry.backoff.growth_factor,
            self.retry.retry_attempts,
            self.retry.retry_delay.as_nanos(),
        )
    }
}

/// Sequencer DA config for the Avail backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailDaConfig {
    pub seed: String,
    pub api_url: String,
    pub app_id: u32,
    pub tip: u64,
}

impl AvailDaConfig {
    pub fn to_json(&self) -> String {
        format!(
            r#"{{"seed": {}, "api_url": {}, "app_id": {}, "tip":{}}}"#,
            quote(&self.seed),
            quote(&self.api_url),
            self.app_id,
            self.tip,
        )
    }
}

/// Pull `namespace_id` back out of a previously rendered blob.
pub fn namespace_from_da_config(blob: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(blob).ok()?;
    value
        .get("namespace_id")
        .and_then(serde_json::Value::as_str)
        .filter(|ns| !ns.is_empty())
        .map(str::to_string)
}

/// Hand the namespace recorded in the sequencer's current `da_config` to
/// `provider` so a regenerated blob keeps publishing under it.
pub fn restore_namespace_from_dymint(
    provider: &dyn DataAvailabilityProvider,
    dymint: &Path,
) -> bool {
    let recorded = get_key_from_toml(dymint, "da_config")
        .ok()
        .as_deref()
        .and_then(namespace_from_da_config);
    match recorded {
        Some(ns) => {
            debug!("Reusing namespace {} from {}", ns, dymint.display());
            provider.restore_namespace_id(&ns)
        }
        None => false,
    }
}

fn quote(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}
