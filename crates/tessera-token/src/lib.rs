//! # tessera-token
//!
//! Stateless bearer tokens for Tessera.
//!
//! This crate provides functionality for:
//! - Building a token's claims from an ordered list of claim providers
//! - Signing (HS256) and optionally encrypting (A256GCM) the claims
//! - Verifying a token and recovering the principal and its special groups
//! - Logging a principal out everywhere without a token blocklist
//!
//! ## Revocation Secrets
//!
//! Nothing about an issued token is stored server side. Instead each
//! principal carries a random revocation secret that is mixed into the
//! signing key:
//!
//! | Part | Source | Changes when |
//! |------|--------|--------------|
//! | Signing secret | Configuration (or generated at startup) | Process restarts without a configured secret |
//! | Revocation secret | Identity store, per principal | Stale login, or `invalidate` |
//! | Client address | Request (when `include_ip` is set) | The client moves |
//!
//! Clearing the revocation secret invalidates every token held by that
//! principal at once.
//!
//! ## Token Profiles
//!
//! - **Login**: minutes-scale lifetime, 60 seconds of clock skew tolerated
//! - **Short-lived**: millisecond-scale lifetime, no skew, never rotates the
//!   revocation secret

pub mod bearer;
pub mod claims;
pub mod codec;
pub mod error;
pub mod handler;
pub mod jwe;
pub mod keys;
pub mod policy;
pub mod provider;
pub mod providers;
pub mod store;

pub use claims::{ClaimSet, ClaimValue};
pub use codec::TokenCodec;
pub use error::{AuthenticationFailed, KeyMaterialError, TokenError};
pub use handler::{Authentication, TokenHandler};
pub use keys::{KeyMaterial, generate_secret};
pub use policy::{SaltPolicy, TokenPolicy};
pub use provider::{AuthContext, ClaimProvider, ClaimProviderRegistry};
pub use providers::{PrincipalClaimProvider, SpecialGroupClaimProvider};
pub use store::{GroupResolver, InMemoryPrincipalStore, PrincipalStore, StaticGroupResolver};
