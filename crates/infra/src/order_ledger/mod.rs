//! Order persistence: immutable purchase records plus their status.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryOrderLedger;
pub use postgres::PostgresOrderLedger;
pub use r#trait::{OrderLedger, StatusChange};
