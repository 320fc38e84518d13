//! Principals and request context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use uuid::Uuid;

/// An authenticated identity as held by the identity store.
///
/// Tessera only ever reads the identifiers and writes `revocation_secret`;
/// everything else belongs to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Stable opaque identifier.
    pub id: Uuid,

    /// Email (or equivalent login name).
    pub email: String,

    /// Per-principal secret mixed into every signing key. Clearing it logs the
    /// principal out everywhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_secret: Option<String>,

    /// Last time the principal was seen active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active: Option<DateTime<Utc>>,
}

impl Principal {
    /// Create a principal with a fresh identifier and no revocation secret.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            revocation_secret: None,
            last_active: None,
        }
    }

    /// Set the last-active timestamp.
    pub fn with_last_active(mut self, at: DateTime<Utc>) -> Self {
        self.last_active = Some(at);
        self
    }

    /// Set the revocation secret.
    pub fn with_revocation_secret(mut self, secret: impl Into<String>) -> Self {
        self.revocation_secret = Some(secret.into());
        self
    }

    /// The revocation secret, if one is set and not blank.
    pub fn active_revocation_secret(&self) -> Option<&str> {
        self.revocation_secret
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }
}

/// What the token subsystem needs to know about the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Remote address of the client, as seen by the transport.
    pub client_address: Option<IpAddr>,

    /// When the principal logged in before the current login, if known.
    pub previous_login: Option<DateTime<Utc>>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client_address(mut self, address: IpAddr) -> Self {
        self.client_address = Some(address);
        self
    }

    pub fn with_previous_login(mut self, at: DateTime<Utc>) -> Self {
        self.previous_login = Some(at);
        self
    }
}
