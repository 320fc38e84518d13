//! Error types for the token crate.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Reasons a token operation failed.
///
/// These are operator-facing. Remote callers only ever see
/// [`AuthenticationFailed`].
#[derive(Debug, Error)]
pub enum TokenError {
    /// The envelope structure could not be parsed.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The encryption envelope could not be opened.
    #[error("encryption envelope rejected: {0}")]
    Encryption(String),

    /// The identifier claim does not resolve to a principal.
    #[error("no principal with identifier {0:?}")]
    UnknownPrincipal(String),

    /// The principal has no active revocation secret.
    #[error("principal {0} has no active revocation secret")]
    RevokedPrincipal(Uuid),

    /// Signature check failed.
    #[error("token signature is invalid")]
    SignatureInvalid,

    /// Token is past its expiration, beyond the clock skew tolerance.
    #[error("token expired at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },

    /// Token is missing a required claim.
    #[error("token missing required claim: {claim}")]
    MissingClaim { claim: String },

    /// A claim provider rejected the shape or value of its claim.
    #[error("claim {claim:?} rejected: {reason}")]
    ClaimApplicationFailure { claim: String, reason: String },

    /// Failed to create token.
    #[error("failed to create token: {0}")]
    TokenCreationFailed(String),

    /// The identity store or group resolver failed.
    #[error("identity store error: {0}")]
    Store(#[from] anyhow::Error),

    /// Key material is unusable.
    #[error(transparent)]
    KeyMaterial(#[from] KeyMaterialError),
}

impl TokenError {
    pub(crate) fn claim(claim: &str, reason: impl Into<String>) -> Self {
        TokenError::ClaimApplicationFailure {
            claim: claim.to_string(),
            reason: reason.into(),
        }
    }

    /// Short, stable label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::MalformedToken(_) => "malformed_token",
            TokenError::Encryption(_) => "encryption",
            TokenError::UnknownPrincipal(_) => "unknown_principal",
            TokenError::RevokedPrincipal(_) => "revoked_principal",
            TokenError::SignatureInvalid => "signature_invalid",
            TokenError::Expired { .. } => "expired",
            TokenError::MissingClaim { .. } => "missing_claim",
            TokenError::ClaimApplicationFailure { .. } => "claim_application_failure",
            TokenError::TokenCreationFailed(_) => "token_creation_failed",
            TokenError::Store(_) => "store",
            TokenError::KeyMaterial(_) => "key_material",
        }
    }
}

/// Startup-time misconfiguration. Never produced by a per-request operation.
#[derive(Debug, Error)]
pub enum KeyMaterialError {
    /// Encryption secret does not fit the cipher.
    #[error("{profile} encryption secret must be {expected} bytes, got {actual}")]
    InvalidEncryptionKey {
        profile: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Token lifetime cannot be represented.
    #[error("{profile} token expiration out of range: {value}")]
    InvalidExpiration { profile: &'static str, value: i64 },

    /// Two claim providers share a key.
    #[error("claim key {0:?} is registered more than once")]
    DuplicateClaimKey(String),

    /// A claim provider uses a key the codec owns.
    #[error("claim key {0:?} is reserved")]
    ReservedClaimKey(String),
}

/// The only failure a remote caller learns about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("authentication failed")]
pub struct AuthenticationFailed;

impl From<TokenError> for AuthenticationFailed {
    fn from(_: TokenError) -> Self {
        AuthenticationFailed
    }
}
