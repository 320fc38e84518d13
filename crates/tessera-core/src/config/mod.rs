//! Configuration types for Tessera.
//!
//! Configuration is loaded from a single YAML file (usually `tessera.yaml`):
//!
//! ```yaml
//! token:
//!   signing:
//!     env: TESSERA_TOKEN_SECRET
//!   encryption:
//!     env: TESSERA_ENCRYPTION_SECRET
//!   expiration: 30          # minutes
//!   include_ip: true
//!   encryption_enabled: false
//!   compression_enabled: false
//! short_lived:
//!   expiration_ms: 2000
//! ```
//!
//! Secrets left unset are generated at startup, which invalidates every
//! outstanding token whenever the process restarts.

pub mod token;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use token::{
    MAX_EXPIRATION_MINUTES, MAX_SHORT_LIVED_EXPIRATION_MS, SecretConfig, ShortLivedConfig,
    TokenConfig,
};

/// Complete Tessera configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TesseraConfig {
    /// Login token settings.
    #[serde(default)]
    pub token: TokenConfig,

    /// Short-lived token settings.
    #[serde(default)]
    pub short_lived: ShortLivedConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TesseraConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that can never produce a usable token.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.compression_enabled && !self.token.encryption_enabled {
            return Err(ConfigError::Config(
                "token.compression_enabled requires token.encryption_enabled".to_string(),
            ));
        }
        if self.short_lived.compression_enabled && !self.short_lived.encryption_enabled {
            return Err(ConfigError::Config(
                "short_lived.compression_enabled requires short_lived.encryption_enabled"
                    .to_string(),
            ));
        }
        if self.token.lifetime().is_none() {
            return Err(ConfigError::Config(format!(
                "token.expiration must be within {} minutes, got {}",
                MAX_EXPIRATION_MINUTES, self.token.expiration
            )));
        }
        if self.short_lived.lifetime().is_none() {
            return Err(ConfigError::Config(format!(
                "short_lived.expiration_ms must be within {} ms, got {}",
                MAX_SHORT_LIVED_EXPIRATION_MS, self.short_lived.expiration_ms
            )));
        }
        // Short-lived tokens must not verify as login tokens.
        if let Some(signing) = self.token.signing.resolve() {
            if self.short_lived.signing.resolve().as_deref() == Some(signing.as_str()) {
                return Err(ConfigError::Config(
                    "short_lived.signing must differ from token.signing".to_string(),
                ));
            }
        }
        Ok(())
    }
}
