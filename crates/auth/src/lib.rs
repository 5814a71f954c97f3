//! `storefront-auth` — authentication and authorization boundary.
//!
//! Decoupled from HTTP and storage: the API layer feeds raw bearer tokens in
//! and gets typed claims and authorization decisions out.

pub mod authorize;
pub mod claims;
pub mod permissions;
pub mod roles;
pub mod token;

pub use authorize::{AuthzError, Principal, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use permissions::Permission;
pub use roles::Role;
pub use token::{Hs256JwtValidator, JwtValidator, TokenError};
