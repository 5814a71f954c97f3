use thiserror::Error;

use storefront_core::DomainError;

/// Failure of a storage backend (or a domain rule enforced inside one).
#[derive(Debug, Error)]
pub enum StoreError {
    /// An in-memory lock was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    Poisoned,

    /// The backend refused the write because a domain rule failed.
    #[error(transparent)]
    Rejected(#[from] DomainError),

    /// A write collided with an existing record (unique key).
    #[error("conflict in {operation}: {message}")]
    Conflict {
        operation: &'static str,
        message: String,
    },

    /// A stored row could not be mapped back into the domain.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },
}

impl StoreError {
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}
