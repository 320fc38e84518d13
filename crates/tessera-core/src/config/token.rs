//! Token configuration.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Longest accepted login token lifetime (one year), in minutes.
pub const MAX_EXPIRATION_MINUTES: i64 = 365 * 24 * 60;

/// Longest accepted short-lived token lifetime (one day), in milliseconds.
pub const MAX_SHORT_LIVED_EXPIRATION_MS: i64 = 24 * 60 * 60 * 1000;

/// Where a secret comes from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretConfig {
    /// Inline secret value.
    #[serde(default)]
    pub value: Option<String>,

    /// Environment variable containing the secret. Takes precedence over `value`.
    #[serde(default)]
    pub env: Option<String>,
}

impl SecretConfig {
    /// Inline secret.
    pub fn inline(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            env: None,
        }
    }

    /// Resolve the secret from environment or inline value.
    ///
    /// Blank values count as unset.
    pub fn resolve(&self) -> Option<String> {
        // Try environment variable first
        if let Some(env_var) = &self.env {
            if let Ok(secret) = std::env::var(env_var) {
                if !secret.trim().is_empty() {
                    return Some(secret);
                }
            }
        }

        self.value.clone().filter(|s| !s.trim().is_empty())
    }
}

/// Configuration for login tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Server-wide signing secret.
    #[serde(default)]
    pub signing: SecretConfig,

    /// Server-wide encryption secret (32 bytes when encryption is enabled).
    #[serde(default)]
    pub encryption: SecretConfig,

    /// Token lifetime in minutes.
    #[serde(default = "default_expiration")]
    pub expiration: i64,

    /// Whether the client address is folded into the signing key.
    #[serde(default = "default_true")]
    pub include_ip: bool,

    /// Whether issued tokens are wrapped in an encryption envelope.
    #[serde(default)]
    pub encryption_enabled: bool,

    /// Whether the signed token is deflated before encryption.
    #[serde(default)]
    pub compression_enabled: bool,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            signing: SecretConfig::default(),
            encryption: SecretConfig::default(),
            expiration: default_expiration(),
            include_ip: true,
            encryption_enabled: false,
            compression_enabled: false,
        }
    }
}

impl TokenConfig {
    /// Token lifetime, or `None` when `expiration` is out of range.
    pub fn lifetime(&self) -> Option<TimeDelta> {
        if self.expiration.unsigned_abs() > MAX_EXPIRATION_MINUTES.unsigned_abs() {
            return None;
        }
        TimeDelta::try_minutes(self.expiration)
    }
}

/// Configuration for short-lived tokens (e.g. download links).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortLivedConfig {
    /// Signing secret, distinct from the login token secret.
    #[serde(default)]
    pub signing: SecretConfig,

    /// Encryption secret.
    #[serde(default)]
    pub encryption: SecretConfig,

    /// Token lifetime in milliseconds.
    #[serde(default = "default_short_lived_expiration_ms")]
    pub expiration_ms: i64,

    #[serde(default = "default_true")]
    pub include_ip: bool,

    #[serde(default)]
    pub encryption_enabled: bool,

    #[serde(default)]
    pub compression_enabled: bool,
}

impl Default for ShortLivedConfig {
    fn default() -> Self {
        Self {
            signing: SecretConfig::default(),
            encryption: SecretConfig::default(),
            expiration_ms: default_short_lived_expiration_ms(),
            include_ip: true,
            encryption_enabled: false,
            compression_enabled: false,
        }
    }
}

impl ShortLivedConfig {
    /// Token lifetime, or `None` when `expiration_ms` is out of range.
    pub fn lifetime(&self) -> Option<TimeDelta> {
        if self.expiration_ms.unsigned_abs() > MAX_SHORT_LIVED_EXPIRATION_MS.unsigned_abs() {
            return None;
        }
        TimeDelta::try_milliseconds(self.expiration_ms)
    }
}

fn default_true() -> bool {
    true
}

fn default_expiration() -> i64 {
    30
}

fn default_short_lived_expiration_ms() -> i64 {
    2000
}
