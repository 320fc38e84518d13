//! Token encoding and decoding.
//!
//! A token is a compact JWS (HS256) over a [`ClaimSet`], optionally wrapped
//! in an encryption envelope (see [`crate::jwe`]). Decoding happens in two
//! steps because the claims must be read before the signing key can be
//! derived:
//!
//! 1. [`TokenCodec::open`] unwraps the encryption envelope and reads the
//!    claims without trusting them.
//! 2. [`TokenCodec::verify`] checks the signature with the derived key and
//!    then the expiration claim.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::claims::{ClaimSet, EXPIRATION_CLAIM};
use crate::error::{KeyMaterialError, TokenError};
use crate::jwe;
use crate::keys::KeyMaterial;
use crate::policy::TokenPolicy;

/// Number of segments in a signed envelope.
pub const SIGNED_SEGMENTS: usize = 3;

/// Whether [`TokenCodec::verify`] enforces the expiration claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryCheck {
    Enforce,
    /// Used when revoking: an expired token still identifies its principal.
    Ignore,
}

/// A signed envelope whose claims have been read but not yet trusted.
#[derive(Debug, Clone)]
pub struct SignedEnvelope {
    compact: String,
    claims: ClaimSet,
}

impl SignedEnvelope {
    /// Unverified claims.
    pub fn claims(&self) -> &ClaimSet {
        &self.claims
    }
}

#[derive(Clone)]
struct Encryption {
    key: Vec<u8>,
    compress: bool,
}

/// Builds and opens token transport strings for one profile.
#[derive(Clone)]
pub struct TokenCodec {
    encryption: Option<Encryption>,
    clock_skew: Duration,
}

impl TokenCodec {
    /// Create a codec, checking the encryption key when encryption is enabled.
    pub fn new(policy: &TokenPolicy, keys: &KeyMaterial) -> Result<Self, KeyMaterialError> {
        let encryption = if policy.encryption_enabled {
            keys.check_encryption_key(policy.profile)?;
            Some(Encryption {
                key: keys.encryption_key().to_vec(),
                compress: policy.compression_enabled,
            })
        } else {
            None
        };

        Ok(Self {
            encryption,
            clock_skew: policy.clock_skew,
        })
    }

    pub fn is_encrypting(&self) -> bool {
        self.encryption.is_some()
    }

    /// Sign the claims and, if enabled, encrypt the result.
    pub fn encode(&self, claims: &ClaimSet, signing_key: &[u8]) -> Result<String, TokenError> {
        let signed = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(signing_key),
        )
        .map_err(|e| TokenError::TokenCreationFailed(e.to_string()))?;

        match &self.encryption {
            Some(encryption) => jwe::seal(&encryption.key, &signed, encryption.compress),
            None => Ok(signed),
        }
    }

    /// Unwrap the encryption envelope (if enabled) and read the claims.
    ///
    /// Nothing returned here is authenticated yet.
    pub fn open(&self, token: &str) -> Result<SignedEnvelope, TokenError> {
        let compact = match &self.encryption {
            Some(encryption) => jwe::open(&encryption.key, token)?,
            None => token.to_string(),
        };
        let claims = peek_claims(&compact)?;
        Ok(SignedEnvelope { compact, claims })
    }

    /// Check the signature, then the expiration claim.
    ///
    /// A token is accepted while `expiration + clock_skew > now`.
    pub fn verify(
        &self,
        envelope: &SignedEnvelope,
        signing_key: &[u8],
        now: DateTime<Utc>,
        expiry: ExpiryCheck,
    ) -> Result<ClaimSet, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<ClaimSet>(
            &envelope.compact,
            &DecodingKey::from_secret(signing_key),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                TokenError::SignatureInvalid
            }
            _ => TokenError::MalformedToken(e.to_string()),
        })?;
        let claims = data.claims;

        let expires_at = claims.expiration().ok_or_else(|| TokenError::MissingClaim {
            claim: EXPIRATION_CLAIM.to_string(),
        })?;
        if expiry == ExpiryCheck::Enforce && expires_at + self.clock_skew <= now {
            return Err(TokenError::Expired {
                expired_at: expires_at,
            });
        }

        Ok(claims)
    }

    /// Decode the claims of an unencrypted token without checking anything.
    ///
    /// For operators inspecting a token. Never use the result to authenticate.
    pub fn inspect_unverified(token: &str) -> Result<ClaimSet, TokenError> {
        peek_claims(token)
    }
}

fn peek_claims(compact: &str) -> Result<ClaimSet, TokenError> {
    let segments = compact.split('.').count();
    if segments != SIGNED_SEGMENTS {
        return Err(TokenError::MalformedToken(format!(
            "expected {} segments, found {}",
            SIGNED_SEGMENTS, segments
        )));
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<ClaimSet>(compact, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| TokenError::MalformedToken(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{ClaimValue, PRINCIPAL_ID_CLAIM};
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    fn codec(encryption_enabled: bool) -> TokenCodec {
        let policy = TokenPolicy {
            encryption_enabled,
            ..TokenPolicy::default()
        };
        TokenCodec::new(&policy, &KeyMaterial::new("server", [3u8; 32])).unwrap()
    }

    fn claims(expires_at: DateTime<Utc>) -> ClaimSet {
        let mut claims = ClaimSet::new();
        claims.insert(PRINCIPAL_ID_CLAIM, ClaimValue::Text("p-1".to_string()));
        claims.set_expiration(expires_at);
        claims
    }

    #[test]
    fn test_encode_open_verify() {
        let codec = codec(false);
        let now = Utc::now();
        let token = codec.encode(&claims(now + Duration::minutes(5)), b"key").unwrap();
        assert_eq!(token.split('.').count(), SIGNED_SEGMENTS);

        let envelope = codec.open(&token).unwrap();
        assert_eq!(envelope.claims().principal_id(), Some("p-1"));

        let verified = codec
            .verify(&envelope, b"key", now, ExpiryCheck::Enforce)
            .unwrap();
        assert_eq!(verified.principal_id(), Some("p-1"));
    }

    #[test]
    fn test_wrong_key_is_signature_invalid() {
        let codec = codec(false);
        let now = Utc::now();
        let token = codec.encode(&claims(now + Duration::minutes(5)), b"key").unwrap();

        let envelope = codec.open(&token).unwrap();
        let err = codec
            .verify(&envelope, b"other", now, ExpiryCheck::Enforce)
            .unwrap_err();
        assert!(matches!(err, TokenError::SignatureInvalid));
    }

    #[test]
    fn test_expiry_respects_clock_skew() {
        let codec = codec(false);
        let now = Utc::now();

        let within = codec.encode(&claims(now - Duration::seconds(59)), b"key").unwrap();
        let envelope = codec.open(&within).unwrap();
        assert!(codec.verify(&envelope, b"key", now, ExpiryCheck::Enforce).is_ok());

        let beyond = codec.encode(&claims(now - Duration::seconds(61)), b"key").unwrap();
        let envelope = codec.open(&beyond).unwrap();
        let err = codec
            .verify(&envelope, b"key", now, ExpiryCheck::Enforce)
            .unwrap_err();
        assert!(matches!(err, TokenError::Expired { .. }));

        assert!(codec.verify(&envelope, b"key", now, ExpiryCheck::Ignore).is_ok());
    }

    #[test]
    fn test_missing_expiration_is_rejected() {
        let codec = codec(false);
        let mut claims = ClaimSet::new();
        claims.insert(PRINCIPAL_ID_CLAIM, ClaimValue::Text("p-1".to_string()));
        let token = codec.encode(&claims, b"key").unwrap();

        let envelope = codec.open(&token).unwrap();
        let err = codec
            .verify(&envelope, b"key", Utc::now(), ExpiryCheck::Enforce)
            .unwrap_err();
        assert!(matches!(err, TokenError::MissingClaim { claim } if claim == "exp"));
    }

    #[test]
    fn test_forged_claims_fail_signature() {
        let codec = codec(false);
        let now = Utc::now();
        let token = codec.encode(&claims(now + Duration::minutes(5)), b"key").unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        let forged_claims = claims(now + Duration::days(365));
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        let envelope = codec.open(&forged).unwrap();
        let err = codec
            .verify(&envelope, b"key", now, ExpiryCheck::Enforce)
            .unwrap_err();
        assert!(matches!(err, TokenError::SignatureInvalid));
    }

    #[test]
    fn test_encrypted_output_is_not_a_signed_envelope() {
        let codec = codec(true);
        let now = Utc::now();
        let token = codec.encode(&claims(now + Duration::minutes(5)), b"key").unwrap();

        assert_eq!(token.split('.').count(), jwe::SEGMENTS);
        assert!(TokenCodec::inspect_unverified(&token).is_err());

        let envelope = codec.open(&token).unwrap();
        assert!(codec.verify(&envelope, b"key", now, ExpiryCheck::Enforce).is_ok());
    }

    #[test]
    fn test_encrypting_codec_rejects_signed_envelope() {
        let plain = codec(false);
        let encrypting = codec(true);
        let token = plain
            .encode(&claims(Utc::now() + Duration::minutes(5)), b"key")
            .unwrap();

        let err = encrypting.open(&token).unwrap_err();
        assert!(matches!(err, TokenError::Encryption(_)));
    }

    #[test]
    fn test_codec_rejects_unusable_encryption_key() {
        let policy = TokenPolicy {
            encryption_enabled: true,
            ..TokenPolicy::default()
        };
        let result = TokenCodec::new(&policy, &KeyMaterial::new("server", "short"));
        assert!(matches!(
            result,
            Err(KeyMaterialError::InvalidEncryptionKey { .. })
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let codec = codec(false);
        assert!(matches!(
            codec.open("not-a-token"),
            Err(TokenError::MalformedToken(_))
        ));
        assert!(matches!(
            codec.open("a.b.c"),
            Err(TokenError::MalformedToken(_))
        ));
    }
}
