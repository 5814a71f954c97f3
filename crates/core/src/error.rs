//! Errors raised by storefront domain rules.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// A business rule refused an operation.
///
/// Storage and transport failures live in the infra and api crates; this
/// type only carries outcomes that replaying the same input would repeat.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input rejected at construction: a zero quantity, a negative or
    /// sub-cent price, an empty product name.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A state change the aggregate never allows, such as moving an order
    /// backwards from `Shipped` to `Pending`.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A path or body id that is not a UUID.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The named record (cart line, order) does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The record already is in the requested state.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: &'static str) -> Self {
        Self::NotFound(what)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_missing_record() {
        assert_eq!(DomainError::not_found("order").to_string(), "order not found");
    }
}
