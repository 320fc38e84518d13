use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tessera_core::{Principal, RequestContext};
use uuid::Uuid;

use crate::claims::{ClaimSet, ClaimValue, SPECIAL_GROUPS_CLAIM};
use crate::error::TokenError;
use crate::provider::{AuthContext, ClaimProvider};
use crate::store::GroupResolver;

/// Carries ephemeral group memberships (`sg`) that are computed at login
/// rather than stored.
pub struct SpecialGroupClaimProvider {
    resolver: Arc<dyn GroupResolver>,
}

impl SpecialGroupClaimProvider {
    pub fn new(resolver: Arc<dyn GroupResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl ClaimProvider for SpecialGroupClaimProvider {
    fn key(&self) -> &str {
        SPECIAL_GROUPS_CLAIM
    }

    async fn value_for(
        &self,
        principal: &Principal,
        request: &RequestContext,
    ) -> Result<ClaimValue, TokenError> {
        let groups = self.resolver.special_groups(principal, request).await?;
        Ok(ClaimValue::List(
            groups.iter().map(Uuid::to_string).collect(),
        ))
    }

    async fn apply_from(
        &self,
        claims: &ClaimSet,
        _request: &RequestContext,
        auth: &mut AuthContext,
    ) -> Result<(), TokenError> {
        // Absent means no special groups.
        let Some(raw) = claims.raw(SPECIAL_GROUPS_CLAIM) else {
            return Ok(());
        };
        let Value::Array(items) = raw else {
            return Err(TokenError::claim(SPECIAL_GROUPS_CLAIM, "expected a list"));
        };

        let mut groups = Vec::with_capacity(items.len());
        for item in items {
            let id = item
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
                .ok_or_else(|| {
                    TokenError::claim(SPECIAL_GROUPS_CLAIM, format!("invalid group id {item}"))
                })?;
            groups.push(id);
        }
        auth.special_groups = groups;
        Ok(())
    }
}
