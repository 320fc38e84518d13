//! # tessera-core
//!
//! Types shared by every Tessera crate: the authenticated [`Principal`], the
//! per-request [`RequestContext`], and the configuration layer.

// Configuration types shared across all Tessera crates
pub mod config;
pub mod principal;

pub use config::{ConfigError, SecretConfig, ShortLivedConfig, TesseraConfig, TokenConfig};
pub use principal::{Principal, RequestContext};
