//! Identity store and group resolver collaborators.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use tessera_core::{Principal, RequestContext};
use uuid::Uuid;

/// Lookup and revocation-secret persistence for principals.
///
/// Implementations own their consistency. A single-row, last-writer-wins
/// update is sufficient for `set_revocation_secret`.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Find a principal by identifier.
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Principal>>;

    /// Replace (or clear, with `None`) the principal's revocation secret.
    async fn set_revocation_secret(&self, id: Uuid, secret: Option<String>)
    -> anyhow::Result<()>;
}

/// Supplies ephemeral group memberships to embed in a token.
#[async_trait]
pub trait GroupResolver: Send + Sync {
    async fn special_groups(
        &self,
        principal: &Principal,
        request: &RequestContext,
    ) -> anyhow::Result<Vec<Uuid>>;
}

/// In-memory principal store.
#[derive(Debug, Default)]
pub struct InMemoryPrincipalStore {
    principals: RwLock<HashMap<Uuid, Principal>>,
}

impl InMemoryPrincipalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a principal.
    pub fn insert(&self, principal: Principal) -> anyhow::Result<()> {
        let mut principals = self
            .principals
            .write()
            .map_err(|e| anyhow::anyhow!("failed to acquire write lock: {}", e))?;
        principals.insert(principal.id, principal);
        Ok(())
    }

    /// Current copy of a principal.
    pub fn get(&self, id: Uuid) -> anyhow::Result<Option<Principal>> {
        let principals = self
            .principals
            .read()
            .map_err(|e| anyhow::anyhow!("failed to acquire read lock: {}", e))?;
        Ok(principals.get(&id).cloned())
    }
}

#[async_trait]
impl PrincipalStore for InMemoryPrincipalStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Principal>> {
        self.get(id)
    }

    async fn set_revocation_secret(
        &self,
        id: Uuid,
        secret: Option<String>,
    ) -> anyhow::Result<()> {
        let mut principals = self
            .principals
            .write()
            .map_err(|e| anyhow::anyhow!("failed to acquire write lock: {}", e))?;
        let principal = principals
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("no principal {}", id))?;
        principal.revocation_secret = secret;
        Ok(())
    }
}

/// Group resolver backed by a fixed map.
#[derive(Debug, Clone, Default)]
pub struct StaticGroupResolver {
    groups: HashMap<Uuid, Vec<Uuid>>,
}

impl StaticGroupResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_groups(mut self, principal: Uuid, groups: Vec<Uuid>) -> Self {
        self.groups.insert(principal, groups);
        self
    }
}

#[async_trait]
impl GroupResolver for StaticGroupResolver {
    async fn special_groups(
        &self,
        principal: &Principal,
        _request: &RequestContext,
    ) -> anyhow::Result<Vec<Uuid>> {
        Ok(self.groups.get(&principal.id).cloned().unwrap_or_default())
    }
}
