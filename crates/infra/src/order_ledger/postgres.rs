//! Postgres-backed order ledger.
//!
//! `update_status` locks the order row (`SELECT ... FOR UPDATE`), runs the
//! transition through the `Order` aggregate and writes back only `status`,
//! `updated_at` and `version`. Order lines are insert-only.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::instrument;
use uuid::Uuid;

use storefront_core::{DomainError, Money, OrderId, ProductId, Quantity, UserId};
use storefront_orders::{OrderLine, OrderRecord, OrderStatus, OrdersReport, ShippingDetails};

use super::r#trait::{OrderLedger, StatusChange, transition};
use crate::db::{decode_error, map_sqlx_error};
use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct PostgresOrderLedger {
    pool: PgPool,
}

impl PostgresOrderLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    shipping_name: String,
    shipping_address: String,
    shipping_phone: String,
    total_price: Decimal,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

#[derive(Debug, FromRow)]
struct LineRow {
    order_id: Uuid,
    line_no: i32,
    product_id: Uuid,
    product_name: String,
    quantity: i64,
    unit_price: Decimal,
}

impl TryFrom<LineRow> for OrderLine {
    type Error = StoreError;

    fn try_from(row: LineRow) -> Result<Self, Self::Error> {
        Ok(OrderLine {
            line_no: u32::try_from(row.line_no).map_err(|e| decode_error("line_no", e))?,
            product_id: ProductId::from_uuid(row.product_id),
            product_name: row.product_name,
            quantity: Quantity::new(row.quantity).map_err(|e| decode_error("quantity", e))?,
            unit_price: Money::new(row.unit_price).map_err(|e| decode_error("unit_price", e))?,
        })
    }
}

fn assemble(row: OrderRow, lines: Vec<OrderLine>) -> Result<OrderRecord, StoreError> {
    Ok(OrderRecord {
        id: OrderId::from_uuid(row.id),
        user_id: UserId::from_uuid(row.user_id),
        lines,
        shipping_details: ShippingDetails {
            name: row.shipping_name,
            address: row.shipping_address,
            phone: row.shipping_phone,
        },
        total_price: Money::new(row.total_price).map_err(|e| decode_error("total_price", e))?,
        status: row.status.parse().map_err(|e| decode_error("status", e))?,
        created_at: row.created_at,
        updated_at: row.updated_at,
        version: u64::try_from(row.version).map_err(|e| decode_error("version", e))?,
    })
}

const ORDER_COLUMNS: &str = "id, user_id, shipping_name, shipping_address, shipping_phone, \
     total_price, status, created_at, updated_at, version";

impl PostgresOrderLedger {
    /// Attach lines to a page of order rows with one extra query.
    async fn hydrate(&self, rows: Vec<OrderRow>) -> Result<Vec<OrderRecord>, StoreError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let line_rows: Vec<LineRow> = sqlx::query_as(
            r#"
            SELECT order_id, line_no, product_id, product_name, quantity, unit_price
            FROM order_lines
            WHERE order_id = ANY($1)
            ORDER BY order_id, line_no
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_order_lines", e))?;

        let mut by_order: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
        for row in line_rows {
            let order_id = row.order_id;
            by_order.entry(order_id).or_default().push(OrderLine::try_from(row)?);
        }

        rows.into_iter()
            .map(|row| {
                let lines = by_order.remove(&row.id).unwrap_or_default();
                assemble(row, lines)
            })
            .collect()
    }
}

async fn load_locked(
    tx: &mut Transaction<'static, Postgres>,
    id: OrderId,
) -> Result<Option<OrderRecord>, StoreError> {
    let row: Option<OrderRow> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
    ))
    .bind(id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("lock_order", e))?;

    let Some(row) = row else {
        return Ok(None);
    };

    let line_rows: Vec<LineRow> = sqlx::query_as(
        r#"
        SELECT order_id, line_no, product_id, product_name, quantity, unit_price
        FROM order_lines
        WHERE order_id = $1
        ORDER BY line_no
        "#,
    )
    .bind(id.as_uuid())
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("load_order_lines", e))?;

    let lines = line_rows
        .into_iter()
        .map(OrderLine::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    assemble(row, lines).map(Some)
}

#[async_trait]
impl OrderLedger for PostgresOrderLedger {
    #[instrument(skip(self, order), fields(order_id = %order.id, user_id = %order.user_id), err)]
    async fn insert(&self, order: OrderRecord) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, user_id, shipping_name, shipping_address, shipping_phone,
                total_price, status, created_at, updated_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(&order.shipping_details.name)
        .bind(&order.shipping_details.address)
        .bind(&order.shipping_details.phone)
        .bind(order.total_price.amount())
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.version as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        for line in &order.lines {
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, line_no, product_id, product_name, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(line.line_no as i32)
            .bind(line.product_id.as_uuid())
            .bind(&line.product_name)
            .bind(i64::from(line.quantity.get()))
            .bind(line.unit_price.amount())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order_line", e))?;
        }

        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Option<OrderRecord>, StoreError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("get_order", e))?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderRecord>, StoreError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_user_orders", e))?;
        self.hydrate(rows).await
    }

    async fn list_all(&self) -> Result<Vec<OrderRecord>, StoreError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_orders", e))?;
        self.hydrate(rows).await
    }

    #[instrument(skip(self), fields(order_id = %id, status = %status), err)]
    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<StatusChange, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let Some(current) = load_locked(&mut tx, id).await? else {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::Rejected(DomainError::NotFound("order")));
        };

        let change = match transition(current, status, at) {
            Ok(change) => change,
            Err(err) => {
                tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(err);
            }
        };

        sqlx::query("UPDATE orders SET status = $2, updated_at = $3, version = $4 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(change.order.status.as_str())
            .bind(change.order.updated_at)
            .bind(change.order.version as i64)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_order_status", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(change)
    }

    async fn has_delivered(&self, user_id: UserId, product_id: ProductId) -> Result<bool, StoreError> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM orders o
                JOIN order_lines l ON l.order_id = o.id
                WHERE o.user_id = $1 AND o.status = 'Delivered' AND l.product_id = $2
            )
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(product_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("has_delivered", e))
    }

    async fn report(&self) -> Result<OrdersReport, StoreError> {
        let (count, sales): (i64, Decimal) =
            sqlx::query_as("SELECT COUNT(*), COALESCE(SUM(total_price), 0) FROM orders")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("orders_report", e))?;

        Ok(OrdersReport {
            total_orders: u64::try_from(count).map_err(|e| decode_error("count", e))?,
            total_sales: Money::new(sales).map_err(|e| decode_error("total_sales", e))?,
        })
    }
}
