//! Shared fixtures for token integration tests.

#![allow(dead_code)]

use chrono::Utc;
use std::net::IpAddr;
use std::sync::Arc;
use tessera_core::{Principal, RequestContext};
use tessera_token::{
    ClaimProviderRegistry, InMemoryPrincipalStore, KeyMaterial, StaticGroupResolver,
    TokenHandler, TokenPolicy,
};
use uuid::Uuid;

pub const SIGNING_SECRET: &str = "integration-signing-secret";
pub const ENCRYPTION_SECRET: [u8; 32] = [9u8; 32];
pub const SHORT_LIVED_SIGNING_SECRET: &str = "integration-short-lived-signing-secret";
pub const SHORT_LIVED_ENCRYPTION_SECRET: [u8; 32] = [5u8; 32];

/// A store holding one principal with two special groups.
pub struct Fixture {
    pub store: Arc<InMemoryPrincipalStore>,
    pub resolver: Arc<StaticGroupResolver>,
    pub principal_id: Uuid,
    pub groups: Vec<Uuid>,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryPrincipalStore::new());
        let principal = Principal::new("jules@example.org").with_last_active(Utc::now());
        let principal_id = principal.id;
        store.insert(principal).expect("store lock");

        let groups = vec![Uuid::new_v4(), Uuid::new_v4()];
        let resolver =
            Arc::new(StaticGroupResolver::new().with_groups(principal_id, groups.clone()));

        Self {
            store,
            resolver,
            principal_id,
            groups,
        }
    }

    pub fn registry(&self) -> ClaimProviderRegistry {
        ClaimProviderRegistry::standard(self.store.clone(), self.resolver.clone())
    }

    /// Handler over this fixture's store, with fixed key material per
    /// profile.
    pub fn handler(&self, policy: TokenPolicy) -> TokenHandler {
        let keys = match policy.profile {
            "short-lived" => {
                KeyMaterial::new(SHORT_LIVED_SIGNING_SECRET, SHORT_LIVED_ENCRYPTION_SECRET)
            }
            _ => KeyMaterial::new(SIGNING_SECRET, ENCRYPTION_SECRET),
        };
        TokenHandler::new(policy, keys, self.registry(), self.store.clone())
            .expect("fixture key material is valid")
    }

    /// The principal as currently stored.
    pub fn principal(&self) -> Principal {
        self.store
            .get(self.principal_id)
            .expect("store lock")
            .expect("fixture principal exists")
    }
}

pub fn address(s: &str) -> IpAddr {
    s.parse().expect("valid address")
}

/// A follow-up login from `addr`.
pub fn request_from(addr: &str) -> RequestContext {
    RequestContext::new()
        .with_client_address(address(addr))
        .with_previous_login(Utc::now())
}

pub fn policy(include_ip: bool, encryption_enabled: bool) -> TokenPolicy {
    TokenPolicy {
        include_ip,
        encryption_enabled,
        ..TokenPolicy::default()
    }
}
