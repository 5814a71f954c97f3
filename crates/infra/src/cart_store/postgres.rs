use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;
use uuid::Uuid;

use storefront_cart::{Cart, CartLine};
use storefront_core::{DomainError, ProductId, Quantity, UserId};

use super::r#trait::CartStore;
use crate::db::{decode_error, map_sqlx_error};
use crate::error::StoreError;

/// Carts in `carts` / `cart_lines`; line order is insertion order.
#[derive(Debug, Clone)]
pub struct PostgresCartStore {
    pool: PgPool,
}

impl PostgresCartStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

async fn touch_cart(
    tx: &mut Transaction<'static, Postgres>,
    user_id: UserId,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO carts (user_id, updated_at) VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE SET updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(user_id.as_uuid())
    .bind(now)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("touch_cart", e))?;
    Ok(())
}

async fn read_cart(
    tx: &mut Transaction<'static, Postgres>,
    user_id: UserId,
) -> Result<Cart, StoreError> {
    let updated_at: Option<DateTime<Utc>> =
        sqlx::query_scalar("SELECT updated_at FROM carts WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("load_cart", e))?;

    let Some(updated_at) = updated_at else {
        return Ok(Cart::empty(user_id, Utc::now()));
    };

    let rows: Vec<(Uuid, i64)> = sqlx::query_as(
        "SELECT product_id, quantity FROM cart_lines WHERE user_id = $1 ORDER BY added_at ASC, product_id ASC",
    )
    .bind(user_id.as_uuid())
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("load_cart", e))?;

    let lines = rows
        .into_iter()
        .map(|(product_id, quantity)| {
            Ok(CartLine {
                product_id: ProductId::from_uuid(product_id),
                quantity: Quantity::new(quantity).map_err(|e| decode_error("quantity", e))?,
            })
        })
        .collect::<Result<Vec<_>, StoreError>>()?;

    Cart::restore(user_id, lines, updated_at).map_err(|e| decode_error("cart_lines", e))
}

#[async_trait]
impl CartStore for PostgresCartStore {
    async fn load(&self, user_id: UserId) -> Result<Cart, StoreError> {
        let mut tx = self.begin().await?;
        let cart = read_cart(&mut tx, user_id).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(cart)
    }

    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id), err)]
    async fn add_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Cart, StoreError> {
        let now = Utc::now();
        let mut tx = self.begin().await?;
        touch_cart(&mut tx, user_id, now).await?;

        // The quantity CHECK rejects a merged total past u32::MAX.
        sqlx::query(
            r#"
            INSERT INTO cart_lines (user_id, product_id, quantity, added_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_lines.quantity + EXCLUDED.quantity
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(i64::from(quantity.get()))
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("add_cart_line", e))?;

        let cart = read_cart(&mut tx, user_id).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(cart)
    }

    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id), err)]
    async fn set_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Cart, StoreError> {
        let mut tx = self.begin().await?;
        let updated = sqlx::query(
            "UPDATE cart_lines SET quantity = $3 WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(i64::from(quantity.get()))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("set_cart_quantity", e))?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::Rejected(DomainError::NotFound("cart line")));
        }

        touch_cart(&mut tx, user_id, Utc::now()).await?;
        let cart = read_cart(&mut tx, user_id).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(cart)
    }

    async fn remove_line(&self, user_id: UserId, product_id: ProductId) -> Result<Cart, StoreError> {
        let mut tx = self.begin().await?;
        let removed = sqlx::query("DELETE FROM cart_lines WHERE user_id = $1 AND product_id = $2")
            .bind(user_id.as_uuid())
            .bind(product_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("remove_cart_line", e))?;

        if removed.rows_affected() > 0 {
            touch_cart(&mut tx, user_id, Utc::now()).await?;
        }
        let cart = read_cart(&mut tx, user_id).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(cart)
    }

    #[instrument(skip(self, ordered), fields(user_id = %user_id, lines = ordered.len()), err)]
    async fn clear_ordered(&self, user_id: UserId, ordered: &[CartLine]) -> Result<(), StoreError> {
        let product_ids: Vec<Uuid> = ordered.iter().map(|l| *l.product_id.as_uuid()).collect();
        let quantities: Vec<i64> = ordered.iter().map(|l| i64::from(l.quantity.get())).collect();

        let mut tx = self.begin().await?;

        let removed = sqlx::query(
            r#"
            DELETE FROM cart_lines AS l
            USING UNNEST($2::uuid[], $3::bigint[]) AS o (product_id, quantity)
            WHERE l.user_id = $1 AND l.product_id = o.product_id AND l.quantity <= o.quantity
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(&product_ids)
        .bind(&quantities)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("clear_ordered_lines", e))?;

        // Whatever is left was topped up since the snapshot and keeps the difference.
        let reduced = sqlx::query(
            r#"
            UPDATE cart_lines AS l
            SET quantity = l.quantity - o.quantity
            FROM UNNEST($2::uuid[], $3::bigint[]) AS o (product_id, quantity)
            WHERE l.user_id = $1 AND l.product_id = o.product_id AND l.quantity > o.quantity
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(&product_ids)
        .bind(&quantities)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("clear_ordered_lines", e))?;

        if removed.rows_affected() + reduced.rows_affected() > 0 {
            sqlx::query("UPDATE carts SET updated_at = $2 WHERE user_id = $1")
                .bind(user_id.as_uuid())
                .bind(Utc::now())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("clear_ordered_lines", e))?;
        }
        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }
}
