//! `storefront-core` — shared domain primitives for the storefront.
//!
//! Pure domain code only: identifiers, money, quantities, the domain error model
//! and the aggregate traits. Nothing in here performs IO.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod money;
pub mod quantity;

pub use aggregate::{Aggregate, AggregateRoot};
pub use error::{DomainError, DomainResult};
pub use id::{OrderId, ProductId, ReviewId, UserId};
pub use money::Money;
pub use quantity::Quantity;
