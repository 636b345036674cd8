//! Fallback store configuration.
//!
//! [`S3Config`] carries the S3 bucket coordinates and optional static
//! credentials, held as [`SecretString`]s that never print and are zeroized
//! on drop. [`FallbackConfig`] carries the backend-independent
//! settings of [`FallbackStore`](crate::FallbackStore).

use serde::Deserialize;
use zeroize::Zeroize;

/// Default number of in-flight store operations.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// A credential string. Redacted in `Debug` and zeroized on drop.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The secret value. Do not log it.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for SecretString {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// S3 bucket coordinates and credentials.
///
/// When both `access_key` and `secret_key` are set they are used as static
/// credentials; otherwise the default AWS credential chain applies.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub access_key: Option<SecretString>,
    pub secret_key: Option<SecretString>,
}

impl S3Config {
    /// The static credential pair, if both halves are present and non-empty.
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key, &self.secret_key) {
            (Some(ak), Some(sk)) if !ak.expose().is_empty() && !sk.expose().is_empty() => {
                Some((ak.expose(), sk.expose()))
            }
            _ => None,
        }
    }
}

/// Settings of the content-addressed fallback store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Prepended verbatim to every object key.
    pub object_prefix: String,
    /// Maximum in-flight operations for multi-item calls. Zero means the
    /// default.
    pub concurrency: usize,
    /// Ask the backend to expire objects at the timeout supplied on `put`.
    pub discard_after_timeout: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            object_prefix: String::new(),
            concurrency: DEFAULT_CONCURRENCY,
            discard_after_timeout: false,
        }
    }
}

impl FallbackConfig {
    /// Effective concurrency, never zero.
    pub fn effective_concurrency(&self) -> usize {
        if self.concurrency == 0 {
            DEFAULT_CONCURRENCY
        } else {
            self.concurrency
        }
    }
}
