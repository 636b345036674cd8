//! Backend configuration.
//!
//! Loaded from environment variables ([`BackendConfig::from_env`]) or a JSON
//! file ([`BackendConfig::from_file`]). Credentials are held as
//! [`SecretString`]s and never appear in `Debug` output.

use std::path::{Path, PathBuf};
use std::time::Duration;

use dab_attest::bridge::{DEFAULT_RETRY_COUNT, DEFAULT_WAIT_INTERVAL};
use dab_attest::BridgeConfig;
use dab_store::{FallbackConfig, S3Config, SecretString};
use serde::Deserialize;

/// Bridge proof service settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// Produce Merkle proof pointers instead of blob pointers.
    pub enabled: bool,
    pub api_url: String,
    pub retry_count: u32,
    pub wait_secs: u64,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: String::new(),
            retry_count: DEFAULT_RETRY_COUNT,
            wait_secs: DEFAULT_WAIT_INTERVAL.as_secs(),
        }
    }
}

impl BridgeSettings {
    pub fn client_config(&self) -> BridgeConfig {
        BridgeConfig::new(self.api_url.clone())
            .with_polling(self.retry_count, Duration::from_secs(self.wait_secs))
    }
}

/// Everything needed to assemble a [`DaBackend`](crate::DaBackend) apart from
/// the chain client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub bridge: BridgeSettings,
    /// Ethereum JSON-RPC endpoint used for attestation reads.
    pub l1_rpc_url: Option<String>,
    /// Address of the attestation contract.
    pub attestation_contract: Option<String>,
    /// Use S3 as the fallback store backend.
    pub s3_enabled: bool,
    pub s3: S3Config,
    /// Use a local directory as the fallback store backend when S3 is off.
    pub fs_store_dir: Option<PathBuf>,
    pub fallback: FallbackConfig,
}

impl BackendConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `DA_BRIDGE_ENABLED` (default: false)
    /// - `DA_BRIDGE_API_URL` (required when the bridge is enabled)
    /// - `DA_BRIDGE_RETRY_COUNT` (default: 10)
    /// - `DA_BRIDGE_WAIT_SECS` (default: 420)
    /// - `DA_L1_RPC_URL`, `DA_ATTESTATION_CONTRACT` (attestation reads; both or neither)
    /// - `DA_S3_ENABLED` (default: false)
    /// - `DA_S3_BUCKET`, `DA_S3_REGION` (required when S3 is enabled)
    /// - `DA_S3_ACCESS_KEY`, `DA_S3_SECRET_KEY` (optional static credentials)
    /// - `DA_S3_OBJECT_PREFIX` (default: empty)
    /// - `DA_S3_CONCURRENCY` (default: 5)
    /// - `DA_S3_DISCARD_AFTER_TIMEOUT` (default: false)
    /// - `DA_FS_STORE_DIR` (optional filesystem backend)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = BridgeSettings::default();

        let config = Self {
            bridge: BridgeSettings {
                enabled: parse_var(&get, "DA_BRIDGE_ENABLED", parse_bool)?.unwrap_or(false),
                api_url: get("DA_BRIDGE_API_URL").unwrap_or_default(),
                retry_count: parse_var(&get, "DA_BRIDGE_RETRY_COUNT", parse_num)?
                    .unwrap_or(defaults.retry_count),
                wait_secs: parse_var(&get, "DA_BRIDGE_WAIT_SECS", parse_num)?
                    .unwrap_or(defaults.wait_secs),
            },
            l1_rpc_url: get("DA_L1_RPC_URL"),
            attestation_contract: get("DA_ATTESTATION_CONTRACT"),
            s3_enabled: parse_var(&get, "DA_S3_ENABLED", parse_bool)?.unwrap_or(false),
            s3: S3Config {
                bucket: get("DA_S3_BUCKET").unwrap_or_default(),
                region: get("DA_S3_REGION").unwrap_or_default(),
                access_key: get("DA_S3_ACCESS_KEY").map(SecretString::new),
                secret_key: get("DA_S3_SECRET_KEY").map(SecretString::new),
            },
            fs_store_dir: get("DA_FS_STORE_DIR").map(PathBuf::from),
            fallback: FallbackConfig {
                object_prefix: lookup("DA_S3_OBJECT_PREFIX").unwrap_or_default(),
                concurrency: parse_var(&get, "DA_S3_CONCURRENCY", parse_num)?
                    .unwrap_or(dab_store::DEFAULT_CONCURRENCY),
                discard_after_timeout: parse_var(&get, "DA_S3_DISCARD_AFTER_TIMEOUT", parse_bool)?
                    .unwrap_or(false),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_slice(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every enabled feature has the settings it needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bridge.enabled && self.bridge.api_url.is_empty() {
            return Err(ConfigError::Missing("bridge API URL (DA_BRIDGE_API_URL)"));
        }
        match (&self.l1_rpc_url, &self.attestation_contract) {
            (Some(_), None) => {
                return Err(ConfigError::Missing(
                    "attestation contract (DA_ATTESTATION_CONTRACT)",
                ))
            }
            (None, Some(_)) => return Err(ConfigError::Missing("L1 RPC URL (DA_L1_RPC_URL)")),
            _ => {}
        }
        if self.s3_enabled {
            if self.s3.bucket.is_empty() {
                return Err(ConfigError::Missing("S3 bucket (DA_S3_BUCKET)"));
            }
            if self.s3.region.is_empty() {
                return Err(ConfigError::Missing("S3 region (DA_S3_REGION)"));
            }
        }
        Ok(())
    }
}

fn parse_var<T, G, P>(get: &G, var: &'static str, parse: P) -> Result<Option<T>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Result<T, String>,
{
    get(var)
        .map(|raw| {
            parse(raw.trim()).map_err(|reason| ConfigError::InvalidValue {
                var,
                value: raw.clone(),
                reason,
            })
        })
        .transpose()
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err("expected a boolean".into()),
    }
}

fn parse_num<T: std::str::FromStr>(raw: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| e.to_string())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("cannot read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
