//! Built-in claim providers.

mod principal;
mod special_groups;

pub use principal::PrincipalClaimProvider;
pub use special_groups::SpecialGroupClaimProvider;
