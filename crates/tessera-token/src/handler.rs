//! Issue, authenticate and invalidate bearer tokens.

use chrono::{DateTime, Utc};
use std::net::IpAddr;
use std::sync::Arc;
use tessera_core::{Principal, RequestContext, ShortLivedConfig, TokenConfig};
use uuid::Uuid;

use crate::claims::{ClaimSet, EXPIRATION_CLAIM, PRINCIPAL_ID_CLAIM};
use crate::codec::{ExpiryCheck, TokenCodec};
use crate::error::{AuthenticationFailed, KeyMaterialError, TokenError};
use crate::keys::{KeyMaterial, generate_secret};
use crate::policy::{SaltPolicy, TokenPolicy};
use crate::provider::{AuthContext, ClaimProviderRegistry};
use crate::store::PrincipalStore;

/// A successfully verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authentication {
    pub principal: Principal,
    pub special_groups: Vec<Uuid>,
    pub expires_at: DateTime<Utc>,
}

/// Stateless token façade for one profile.
///
/// Holds only immutable state; share it behind an `Arc`.
pub struct TokenHandler {
    policy: TokenPolicy,
    keys: KeyMaterial,
    codec: TokenCodec,
    registry: ClaimProviderRegistry,
    store: Arc<dyn PrincipalStore>,
}

impl TokenHandler {
    /// Create a handler. Fails on key material the codec cannot use.
    pub fn new(
        policy: TokenPolicy,
        keys: KeyMaterial,
        registry: ClaimProviderRegistry,
        store: Arc<dyn PrincipalStore>,
    ) -> Result<Self, KeyMaterialError> {
        let codec = TokenCodec::new(&policy, &keys)?;
        Ok(Self {
            policy,
            keys,
            codec,
            registry,
            store,
        })
    }

    /// Login token handler from the `token` configuration section.
    pub fn login(
        config: &TokenConfig,
        registry: ClaimProviderRegistry,
        store: Arc<dyn PrincipalStore>,
    ) -> Result<Self, KeyMaterialError> {
        let policy = TokenPolicy::login(config)?;
        let keys = KeyMaterial::from_config(policy.profile, &config.signing, &config.encryption);
        Self::new(policy, keys, registry, store)
    }

    /// Short-lived token handler from the `short_lived` configuration section.
    pub fn short_lived(
        config: &ShortLivedConfig,
        registry: ClaimProviderRegistry,
        store: Arc<dyn PrincipalStore>,
    ) -> Result<Self, KeyMaterialError> {
        let policy = TokenPolicy::short_lived(config)?;
        let keys = KeyMaterial::from_config(policy.profile, &config.signing, &config.encryption);
        Self::new(policy, keys, registry, store)
    }

    pub fn policy(&self) -> &TokenPolicy {
        &self.policy
    }

    /// Issue a token for an already authenticated principal.
    pub async fn issue(
        &self,
        principal: &Principal,
        request: &RequestContext,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.policy.expiration)
            .ok_or_else(|| {
                TokenError::TokenCreationFailed(format!(
                    "{} token expiration overflows",
                    self.policy.profile
                ))
            })?;
        let revocation_secret = self.revocation_secret_for(principal, request, now).await?;

        let mut claims = self.registry.collect(principal, request).await?;
        claims.set_expiration(expires_at);

        let key = self
            .keys
            .effective_signing_key(&revocation_secret, self.bound_address(request));
        let token = self.codec.encode(&claims, &key)?;

        tracing::debug!(
            profile = self.policy.profile,
            principal_id = %principal.id,
            encrypted = self.codec.is_encrypting(),
            "issued token"
        );
        Ok(token)
    }

    /// Authenticate a bearer token.
    ///
    /// A blank token is not a failure: it yields `Ok(None)`. Every failure
    /// collapses into [`AuthenticationFailed`]; the reason is logged.
    pub async fn authenticate(
        &self,
        token: &str,
        request: &RequestContext,
    ) -> Result<Option<Authentication>, AuthenticationFailed> {
        self.authenticate_detailed(token, request)
            .await
            .map_err(AuthenticationFailed::from)
    }

    /// Same as [`authenticate`](Self::authenticate) but keeps the reason.
    ///
    /// For in-process callers only. Never forward the error to a client.
    pub async fn authenticate_detailed(
        &self,
        token: &str,
        request: &RequestContext,
    ) -> Result<Option<Authentication>, TokenError> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(None);
        }

        match self.verify_and_apply(token, request).await {
            Ok(authentication) => Ok(Some(authentication)),
            Err(e) => {
                self.log_rejection(&e, request);
                Err(e)
            }
        }
    }

    /// Log the token's principal out everywhere by clearing its revocation
    /// secret.
    ///
    /// An expired token still identifies its principal. Blank tokens and
    /// principals that are already logged out are a no-op.
    pub async fn invalidate(&self, token: &str, request: &RequestContext) -> Result<(), TokenError> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(());
        }

        match self.verify(token, request, ExpiryCheck::Ignore).await {
            Ok((principal, _)) => {
                self.store.set_revocation_secret(principal.id, None).await?;
                tracing::info!(
                    profile = self.policy.profile,
                    principal_id = %principal.id,
                    "cleared revocation secret"
                );
                Ok(())
            }
            Err(TokenError::RevokedPrincipal(id)) => {
                tracing::debug!(principal_id = %id, "principal already logged out");
                Ok(())
            }
            Err(e) => {
                self.log_rejection(&e, request);
                Err(e)
            }
        }
    }

    async fn verify_and_apply(
        &self,
        token: &str,
        request: &RequestContext,
    ) -> Result<Authentication, TokenError> {
        let (principal, claims) = self.verify(token, request, ExpiryCheck::Enforce).await?;
        let expires_at = claims.expiration().ok_or_else(|| TokenError::MissingClaim {
            claim: EXPIRATION_CLAIM.to_string(),
        })?;

        let mut auth = AuthContext::for_principal(principal);
        self.registry.apply(&claims, request, &mut auth).await?;

        let principal = auth.principal.ok_or_else(|| TokenError::MissingClaim {
            claim: PRINCIPAL_ID_CLAIM.to_string(),
        })?;
        Ok(Authentication {
            principal,
            special_groups: auth.special_groups,
            expires_at,
        })
    }

    /// Resolve the principal named in the token, then check the signature
    /// with that principal's key.
    async fn verify(
        &self,
        token: &str,
        request: &RequestContext,
        expiry: ExpiryCheck,
    ) -> Result<(Principal, ClaimSet), TokenError> {
        let envelope = self.codec.open(token)?;

        let raw_id = envelope
            .claims()
            .principal_id()
            .ok_or_else(|| TokenError::MissingClaim {
                claim: PRINCIPAL_ID_CLAIM.to_string(),
            })?;
        let id =
            Uuid::parse_str(raw_id).map_err(|_| TokenError::UnknownPrincipal(raw_id.to_string()))?;
        let principal = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| TokenError::UnknownPrincipal(raw_id.to_string()))?;

        let key = {
            let secret = principal
                .active_revocation_secret()
                .ok_or(TokenError::RevokedPrincipal(principal.id))?;
            self.keys
                .effective_signing_key(secret, self.bound_address(request))
        };
        let claims = self.codec.verify(&envelope, &key, Utc::now(), expiry)?;
        Ok((principal, claims))
    }

    /// Pick the revocation secret to sign with, rotating it when the salt
    /// policy says so.
    async fn revocation_secret_for(
        &self,
        principal: &Principal,
        request: &RequestContext,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let current = principal.active_revocation_secret();

        match self.policy.salt_policy {
            SaltPolicy::RequireExisting => current
                .map(str::to_string)
                .ok_or(TokenError::RevokedPrincipal(principal.id)),
            SaltPolicy::RotateWhenStale => {
                // Logins within one expiration window of each other share the
                // secret, so one principal can hold tokens on several devices.
                let recent = request.previous_login.is_some()
                    && principal
                        .last_active
                        .is_some_and(|at| now - at <= self.policy.expiration);
                if let (Some(secret), true) = (current, recent) {
                    return Ok(secret.to_string());
                }

                let secret = generate_secret();
                self.store
                    .set_revocation_secret(principal.id, Some(secret.clone()))
                    .await?;
                tracing::info!(
                    profile = self.policy.profile,
                    principal_id = %principal.id,
                    "rotated revocation secret"
                );
                Ok(secret)
            }
        }
    }

    fn bound_address<'a>(&self, request: &'a RequestContext) -> Option<&'a IpAddr> {
        if self.policy.include_ip {
            request.client_address.as_ref()
        } else {
            None
        }
    }

    fn log_rejection(&self, error: &TokenError, request: &RequestContext) {
        let client_address = request.client_address.map(|a| a.to_string());
        match error {
            TokenError::Store(_) => tracing::error!(
                profile = self.policy.profile,
                reason = error.kind(),
                error = %error,
                "identity store failed during token verification"
            ),
            _ => tracing::warn!(
                profile = self.policy.profile,
                reason = error.kind(),
                client_address = client_address.as_deref(),
                error = %error,
                "token rejected"
            ),
        }
    }
}
