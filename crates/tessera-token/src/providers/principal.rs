use async_trait::async_trait;
use std::sync::Arc;
use tessera_core::{Principal, RequestContext};
use uuid::Uuid;

use crate::claims::{ClaimSet, ClaimValue, PRINCIPAL_ID_CLAIM};
use crate::error::TokenError;
use crate::provider::{AuthContext, ClaimProvider};
use crate::store::PrincipalStore;

/// Carries the principal identifier (`eid`) and resolves it on the way back.
pub struct PrincipalClaimProvider {
    store: Arc<dyn PrincipalStore>,
}

impl PrincipalClaimProvider {
    pub fn new(store: Arc<dyn PrincipalStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ClaimProvider for PrincipalClaimProvider {
    fn key(&self) -> &str {
        PRINCIPAL_ID_CLAIM
    }

    async fn value_for(
        &self,
        principal: &Principal,
        _request: &RequestContext,
    ) -> Result<ClaimValue, TokenError> {
        Ok(ClaimValue::Text(principal.id.to_string()))
    }

    async fn apply_from(
        &self,
        claims: &ClaimSet,
        _request: &RequestContext,
        auth: &mut AuthContext,
    ) -> Result<(), TokenError> {
        let raw = claims
            .principal_id()
            .ok_or_else(|| TokenError::MissingClaim {
                claim: PRINCIPAL_ID_CLAIM.to_string(),
            })?;
        let id = Uuid::parse_str(raw).map_err(|_| TokenError::UnknownPrincipal(raw.to_string()))?;

        // The handler has usually resolved the principal already.
        if auth.principal.as_ref().is_some_and(|p| p.id == id) {
            return Ok(());
        }

        let principal = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| TokenError::UnknownPrincipal(raw.to_string()))?;
        auth.principal = Some(principal);
        Ok(())
    }
}
