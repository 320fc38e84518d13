//! Key material for signing and encrypting tokens.
//!
//! The signing key for a given token is never stored. It is derived per
//! request as
//!
//! ```text
//! server signing secret ++ principal revocation secret [++ client address]
//! ```
//!
//! so rotating or clearing a principal's revocation secret invalidates every
//! token previously signed for that principal.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use std::fmt;
use std::net::IpAddr;
use tessera_core::SecretConfig;
use zeroize::Zeroizing;

use crate::error::KeyMaterialError;

/// Random bytes in a generated secret. Base64 turns these into 32 characters.
pub const SECRET_BYTES: usize = 24;

/// AES-256 key length required of the encryption secret.
pub const ENCRYPTION_KEY_BYTES: usize = 32;

/// Generate a random secret: 24 random bytes, base64 encoded.
///
/// Used for server secrets left unset and for principal revocation secrets.
pub fn generate_secret() -> String {
    let mut rng = rand::rng();
    let mut bytes = [0u8; SECRET_BYTES];
    rng.fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

/// Server-wide secrets for one token profile.
///
/// Immutable after startup and safe to share between requests.
#[derive(Clone)]
pub struct KeyMaterial {
    signing_secret: Zeroizing<Vec<u8>>,
    encryption_secret: Zeroizing<Vec<u8>>,
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("signing_secret", &"<redacted>")
            .field("encryption_secret", &"<redacted>")
            .finish()
    }
}

impl KeyMaterial {
    /// Build key material from explicit secrets.
    pub fn new(signing_secret: impl AsRef<[u8]>, encryption_secret: impl AsRef<[u8]>) -> Self {
        Self {
            signing_secret: Zeroizing::new(signing_secret.as_ref().to_vec()),
            encryption_secret: Zeroizing::new(encryption_secret.as_ref().to_vec()),
        }
    }

    /// Resolve both secrets from configuration, generating any that are unset.
    ///
    /// A generated secret lives only as long as the process; every token
    /// signed with it becomes invalid on restart.
    pub fn from_config(
        profile: &'static str,
        signing: &SecretConfig,
        encryption: &SecretConfig,
    ) -> Self {
        let signing_secret = signing.resolve().unwrap_or_else(|| {
            tracing::warn!(
                profile,
                "no signing secret configured, generated a random one; \
                 all tokens will be invalidated when the process restarts"
            );
            generate_secret()
        });
        let encryption_secret = encryption.resolve().unwrap_or_else(|| {
            tracing::warn!(
                profile,
                "no encryption secret configured, generated a random one; \
                 all encrypted tokens will be invalidated when the process restarts"
            );
            generate_secret()
        });

        Self::new(signing_secret, encryption_secret)
    }

    /// Ensure the encryption secret can key AES-256-GCM.
    pub fn check_encryption_key(&self, profile: &'static str) -> Result<(), KeyMaterialError> {
        if self.encryption_secret.len() != ENCRYPTION_KEY_BYTES {
            return Err(KeyMaterialError::InvalidEncryptionKey {
                profile,
                expected: ENCRYPTION_KEY_BYTES,
                actual: self.encryption_secret.len(),
            });
        }
        Ok(())
    }

    /// Derive the signing key for one principal and request.
    pub fn effective_signing_key(
        &self,
        revocation_secret: &str,
        client_address: Option<&IpAddr>,
    ) -> Zeroizing<Vec<u8>> {
        let mut key = Zeroizing::new(self.signing_secret.to_vec());
        key.extend_from_slice(revocation_secret.as_bytes());
        if let Some(address) = client_address {
            key.extend_from_slice(address.to_string().as_bytes());
        }
        key
    }

    /// The encryption secret, used directly as the content encryption key.
    pub fn encryption_key(&self) -> &[u8] {
        &self.encryption_secret
    }
}
