//! Token profiles.

use chrono::Duration;
use tessera_core::{ShortLivedConfig, TokenConfig};

use crate::error::KeyMaterialError;

const LOGIN_PROFILE: &str = "login";
const SHORT_LIVED_PROFILE: &str = "short-lived";

/// Clock skew tolerated when checking login token expiration.
pub const LOGIN_CLOCK_SKEW_SECONDS: i64 = 60;

/// How issuance treats the principal's revocation secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaltPolicy {
    /// Reuse the current secret while logins stay within one expiration
    /// window of each other; otherwise generate and persist a new one.
    RotateWhenStale,
    /// Only issue for a principal that already holds a secret. Never writes.
    RequireExisting,
}

/// Immutable settings for one kind of token.
#[derive(Debug, Clone)]
pub struct TokenPolicy {
    /// Name used in logs and errors.
    pub profile: &'static str,
    pub expiration: Duration,
    pub clock_skew: Duration,
    pub include_ip: bool,
    pub encryption_enabled: bool,
    pub compression_enabled: bool,
    pub salt_policy: SaltPolicy,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        let config = TokenConfig::default();
        Self::login_with(&config, Duration::minutes(config.expiration))
    }
}

impl TokenPolicy {
    /// Login tokens: minutes-scale lifetime, 60 second skew tolerance.
    pub fn login(config: &TokenConfig) -> Result<Self, KeyMaterialError> {
        let expiration = config
            .lifetime()
            .ok_or(KeyMaterialError::InvalidExpiration {
                profile: LOGIN_PROFILE,
                value: config.expiration,
            })?;
        Ok(Self::login_with(config, expiration))
    }

    /// Short-lived tokens: millisecond-scale lifetime and no skew tolerance.
    pub fn short_lived(config: &ShortLivedConfig) -> Result<Self, KeyMaterialError> {
        let expiration = config
            .lifetime()
            .ok_or(KeyMaterialError::InvalidExpiration {
                profile: SHORT_LIVED_PROFILE,
                value: config.expiration_ms,
            })?;
        Ok(Self {
            profile: SHORT_LIVED_PROFILE,
            expiration,
            clock_skew: Duration::zero(),
            include_ip: config.include_ip,
            encryption_enabled: config.encryption_enabled,
            compression_enabled: config.compression_enabled,
            salt_policy: SaltPolicy::RequireExisting,
        })
    }

    fn login_with(config: &TokenConfig, expiration: Duration) -> Self {
        Self {
            profile: LOGIN_PROFILE,
            expiration,
            clock_skew: Duration::seconds(LOGIN_CLOCK_SKEW_SECONDS),
            include_ip: config.include_ip,
            encryption_enabled: config.encryption_enabled,
            compression_enabled: config.compression_enabled,
            salt_policy: SaltPolicy::RotateWhenStale,
        }
    }

    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration;
        self
    }
}
