//! Postgres-backed catalog.
//!
//! The two conditional writes map onto single statements or a short
//! transaction:
//!
//! | Operation | SQL shape |
//! |---|---|
//! | `try_take_stock` | `UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2 RETURNING stock` |
//! | `append_review` | lock the product row, `INSERT ... ON CONFLICT (product_id, user_id) DO NOTHING`, recompute |
//!
//! No method reads a counter into Rust and writes it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use tracing::instrument;
use uuid::Uuid;

use storefront_catalog::{Product, ProductRecord};
use storefront_core::{Money, ProductId, Quantity, ReviewId, UserId};
use storefront_reviews::{Rating, RatingSummary, Review};

use super::r#trait::{CatalogStore, ReviewAppend, StockTake};
use crate::db::{decode_error, map_sqlx_error};
use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: String,
    category: String,
    price: Decimal,
    stock: i64,
    rating: f64,
    num_reviews: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product::restore(ProductRecord {
            id: ProductId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            category: row.category,
            price: Money::new(row.price).map_err(|e| decode_error("price", e))?,
            stock: u32::try_from(row.stock).map_err(|e| decode_error("stock", e))?,
            rating: row.rating,
            num_reviews: u32::try_from(row.num_reviews).map_err(|e| decode_error("num_reviews", e))?,
            created_at: row.created_at,
        }))
    }
}

#[derive(Debug, FromRow)]
struct ReviewRow {
    id: Uuid,
    user_id: Uuid,
    author_name: String,
    rating: i16,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = StoreError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        Ok(Review {
            id: ReviewId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            author_name: row.author_name,
            rating: Rating::new(i64::from(row.rating)).map_err(|e| decode_error("rating", e))?,
            comment: row.comment,
            created_at: row.created_at,
        })
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name, description, category, price, stock, rating, num_reviews, created_at";

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    #[instrument(skip(self, product), fields(product_id = %product.id()), err)]
    async fn insert(&self, product: Product) -> Result<(), StoreError> {
        let record = product.to_record();
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, category, price, stock, rating, num_reviews, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.category)
        .bind(record.price.amount())
        .bind(i64::from(record.stock))
        .bind(record.rating)
        .bind(record.num_reviews as i32)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("get_product", e))?;
        row.map(Product::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;
        rows.into_iter().map(Product::try_from).collect()
    }

    #[instrument(skip(self), fields(product_id = %id, quantity = quantity.get()), err)]
    async fn try_take_stock(&self, id: ProductId, quantity: Quantity) -> Result<StockTake, StoreError> {
        let requested = i64::from(quantity.get());
        let taken: Option<i64> = sqlx::query_scalar(
            "UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2 RETURNING stock",
        )
        .bind(id.as_uuid())
        .bind(requested)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("take_stock", e))?;

        if let Some(remaining) = taken {
            let remaining = u32::try_from(remaining).map_err(|e| decode_error("stock", e))?;
            return Ok(StockTake::Taken { remaining });
        }

        // Zero rows: either the product is gone or the guard failed.
        let available: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("take_stock", e))?;

        match available {
            Some(stock) => Ok(StockTake::Insufficient {
                available: u32::try_from(stock).map_err(|e| decode_error("stock", e))?,
            }),
            None => Ok(StockTake::Missing),
        }
    }

    #[instrument(skip(self), fields(product_id = %id, quantity = quantity.get()), err)]
    async fn add_stock(&self, id: ProductId, quantity: Quantity) -> Result<Option<u32>, StoreError> {
        // The CHECK on `stock` turns an overflow into 23514 -> Rejected.
        let stock: Option<i64> =
            sqlx::query_scalar("UPDATE products SET stock = stock + $2 WHERE id = $1 RETURNING stock")
                .bind(id.as_uuid())
                .bind(i64::from(quantity.get()))
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("add_stock", e))?;

        stock
            .map(|s| u32::try_from(s).map_err(|e| decode_error("stock", e)))
            .transpose()
    }

    async fn reviews(&self, id: ProductId) -> Result<Option<Vec<Review>>, StoreError> {
        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_reviews", e))?;
        if exists.is_none() {
            return Ok(None);
        }

        let rows: Vec<ReviewRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, author_name, rating, comment, created_at
            FROM product_reviews
            WHERE product_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_reviews", e))?;

        rows.into_iter()
            .map(Review::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    async fn has_review(&self, id: ProductId, user_id: UserId) -> Result<bool, StoreError> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM product_reviews WHERE product_id = $1 AND user_id = $2)",
        )
        .bind(id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("has_review", e))
    }

    #[instrument(skip(self, review), fields(product_id = %id, user_id = %review.user_id), err)]
    async fn append_review(&self, id: ProductId, review: Review) -> Result<ReviewAppend, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Serialize appends per product so the recomputed summary sees every row.
        let locked: Option<Uuid> = sqlx::query_scalar("SELECT id FROM products WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_product", e))?;
        if locked.is_none() {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Ok(ReviewAppend::Missing);
        }

        let inserted: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO product_reviews (id, product_id, user_id, author_name, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (product_id, user_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(review.id.as_uuid())
        .bind(id.as_uuid())
        .bind(review.user_id.as_uuid())
        .bind(&review.author_name)
        .bind(i16::from(review.rating.get()))
        .bind(review.comment.as_deref())
        .bind(review.created_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_review", e))?;

        if inserted.is_none() {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Ok(ReviewAppend::Duplicate);
        }

        let (average, count): (f64, i32) = sqlx::query_as(
            r#"
            UPDATE products p
            SET rating = agg.average, num_reviews = agg.count
            FROM (
                SELECT COALESCE(AVG(rating), 0)::float8 AS average, COUNT(*)::int4 AS count
                FROM product_reviews
                WHERE product_id = $1
            ) agg
            WHERE p.id = $1
            RETURNING p.rating, p.num_reviews
            "#,
        )
        .bind(id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("recompute_rating", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(ReviewAppend::Appended(RatingSummary {
            average,
            count: u32::try_from(count).map_err(|e| decode_error("num_reviews", e))?,
        }))
    }
}
