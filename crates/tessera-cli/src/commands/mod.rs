//! CLI command implementations for Tessera.

pub mod keys;
pub mod token;
