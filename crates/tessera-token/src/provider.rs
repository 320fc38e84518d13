//! Claim providers and the ordered registry that runs them.
//!
//! Each provider owns one claim key. At issuance the registry asks every
//! provider for its value; at verification it hands the verified claims back
//! to every provider, in the same order, so each can write what it recovered
//! into an [`AuthContext`].

use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tessera_core::{Principal, RequestContext};
use uuid::Uuid;

use crate::claims::{ClaimSet, ClaimValue, EXPIRATION_CLAIM};
use crate::error::{KeyMaterialError, TokenError};
use crate::providers::{PrincipalClaimProvider, SpecialGroupClaimProvider};
use crate::store::{GroupResolver, PrincipalStore};

/// What verification has recovered from a token so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    /// The principal named by the token, once resolved.
    pub principal: Option<Principal>,
    /// Ephemeral group memberships carried by the token.
    pub special_groups: Vec<Uuid>,
}

impl AuthContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a principal that has already been looked up.
    pub fn for_principal(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
            special_groups: Vec::new(),
        }
    }
}

/// A source of one claim.
#[async_trait]
pub trait ClaimProvider: Send + Sync {
    /// Claim key. Unique within a registry.
    fn key(&self) -> &str;

    /// Value to embed at issuance. Must not have side effects.
    async fn value_for(
        &self,
        principal: &Principal,
        request: &RequestContext,
    ) -> Result<ClaimValue, TokenError>;

    /// Read this provider's claim back out of a verified token.
    async fn apply_from(
        &self,
        claims: &ClaimSet,
        request: &RequestContext,
        auth: &mut AuthContext,
    ) -> Result<(), TokenError>;
}

/// Ordered, read-only list of claim providers.
///
/// A provider whose `apply_from` depends on the resolved principal must come
/// after [`PrincipalClaimProvider`].
#[derive(Clone)]
pub struct ClaimProviderRegistry {
    providers: Vec<Arc<dyn ClaimProvider>>,
}

impl fmt::Debug for ClaimProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

impl ClaimProviderRegistry {
    /// Build a registry, rejecting duplicate and reserved keys.
    pub fn new(providers: Vec<Arc<dyn ClaimProvider>>) -> Result<Self, KeyMaterialError> {
        let mut seen = HashSet::new();
        for provider in &providers {
            let key = provider.key();
            if key == EXPIRATION_CLAIM {
                return Err(KeyMaterialError::ReservedClaimKey(key.to_string()));
            }
            if !seen.insert(key.to_string()) {
                return Err(KeyMaterialError::DuplicateClaimKey(key.to_string()));
            }
        }
        Ok(Self { providers })
    }

    /// The principal provider followed by the special group provider.
    pub fn standard(store: Arc<dyn PrincipalStore>, resolver: Arc<dyn GroupResolver>) -> Self {
        Self {
            providers: vec![
                Arc::new(PrincipalClaimProvider::new(store)),
                Arc::new(SpecialGroupClaimProvider::new(resolver)),
            ],
        }
    }

    /// Build the claim set for an issuance, in registry order.
    pub async fn collect(
        &self,
        principal: &Principal,
        request: &RequestContext,
    ) -> Result<ClaimSet, TokenError> {
        let mut claims = ClaimSet::new();
        for provider in &self.providers {
            let value = provider.value_for(principal, request).await?;
            claims.insert(provider.key(), value);
        }
        Ok(claims)
    }

    /// Apply every provider to verified claims, in registry order.
    pub async fn apply(
        &self,
        claims: &ClaimSet,
        request: &RequestContext,
        auth: &mut AuthContext,
    ) -> Result<(), TokenError> {
        for provider in &self.providers {
            provider.apply_from(claims, request, auth).await?;
        }
        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|p| p.key())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryPrincipalStore, StaticGroupResolver};

    struct FixedClaim {
        key: &'static str,
        value: &'static str,
    }

    #[async_trait]
    impl ClaimProvider for FixedClaim {
        fn key(&self) -> &str {
            self.key
        }

        async fn value_for(
            &self,
            _principal: &Principal,
            _request: &RequestContext,
        ) -> Result<ClaimValue, TokenError> {
            Ok(self.value.into())
        }

        async fn apply_from(
            &self,
            claims: &ClaimSet,
            _request: &RequestContext,
            _auth: &mut AuthContext,
        ) -> Result<(), TokenError> {
            match claims.text(self.key) {
                Some(v) if v == self.value => Ok(()),
                _ => Err(TokenError::claim(self.key, "unexpected value")),
            }
        }
    }

    fn fixed(key: &'static str, value: &'static str) -> Arc<dyn ClaimProvider> {
        Arc::new(FixedClaim { key, value })
    }

    #[test]
    fn test_duplicate_keys_are_rejected() {
        let err = ClaimProviderRegistry::new(vec![fixed("tenant", "a"), fixed("tenant", "b")])
            .unwrap_err();
        assert!(matches!(err, KeyMaterialError::DuplicateClaimKey(k) if k == "tenant"));
    }

    #[test]
    fn test_expiration_key_is_reserved() {
        let err = ClaimProviderRegistry::new(vec![fixed("exp", "soon")]).unwrap_err();
        assert!(matches!(err, KeyMaterialError::ReservedClaimKey(_)));
    }

    #[test]
    fn test_standard_registry_order() {
        let registry = ClaimProviderRegistry::standard(
            Arc::new(InMemoryPrincipalStore::new()),
            Arc::new(StaticGroupResolver::new()),
        );
        let keys: Vec<_> = registry.keys().collect();
        assert_eq!(keys, vec!["eid", "sg"]);
        assert_eq!(format!("{:?}", registry), r#"["eid", "sg"]"#);
    }

    #[tokio::test]
    async fn test_collect_and_apply_in_order() {
        let registry =
            ClaimProviderRegistry::new(vec![fixed("b", "2"), fixed("a", "1")]).unwrap();
        let principal = Principal::new("carol@example.org");
        let request = RequestContext::new();

        let claims = registry.collect(&principal, &request).await.unwrap();
        let keys: Vec<_> = claims.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);

        let mut auth = AuthContext::new();
        registry.apply(&claims, &request, &mut auth).await.unwrap();

        let mut tampered = claims.clone();
        tampered.insert("a", "9".into());
        let err = registry
            .apply(&tampered, &request, &mut auth)
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::ClaimApplicationFailure { claim, .. } if claim == "a"));
    }
}
