//! Postgres wiring: connection pool, migrations and sqlx error mapping.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use storefront_core::DomainError;

use crate::error::StoreError;

/// Connect to Postgres and bring the schema up to date.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| StoreError::Database {
            operation: "migrate",
            message: e.to_string(),
        })?;

    info!(max_connections, "postgres pool ready, migrations applied");
    Ok(pool)
}

/// Map a sqlx error onto [`StoreError`].
///
/// | SQLSTATE | Meaning | Mapped to |
/// |---|---|---|
/// | `23505` | unique violation | `Conflict` |
/// | `23514` | check violation | `Rejected(Validation)` |
/// | other | | `Database` |
pub(crate) fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_string();
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict { operation, message },
                Some("23514") => StoreError::Rejected(DomainError::validation(message)),
                _ => StoreError::Database { operation, message },
            }
        }
        sqlx::Error::PoolClosed => StoreError::Database {
            operation,
            message: "connection pool closed".to_string(),
        },
        other => StoreError::Database {
            operation,
            message: other.to_string(),
        },
    }
}

/// Map a column decode failure onto [`StoreError::Corrupt`].
pub(crate) fn decode_error(column: &str, err: impl core::fmt::Display) -> StoreError {
    StoreError::corrupt(format!("column {column}: {err}"))
}
