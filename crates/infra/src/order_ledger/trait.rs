use async_trait::async_trait;
use chrono::{DateTime, Utc};

use storefront_core::{Aggregate, OrderId, ProductId, UserId};
use storefront_orders::{Order, OrderCommand, OrderEvent, OrderRecord, OrderStatus, OrdersReport, UpdateStatus};

use crate::error::StoreError;

/// A committed status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub order: OrderRecord,
    pub event: OrderEvent,
}

/// Order persistence.
///
/// Lines, prices and the total are written once by `insert` and never
/// touched again; `update_status` is the only mutation.
#[async_trait]
pub trait OrderLedger: Send + Sync {
    async fn insert(&self, order: OrderRecord) -> Result<(), StoreError>;

    async fn get(&self, id: OrderId) -> Result<Option<OrderRecord>, StoreError>;

    /// A user's orders, newest first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderRecord>, StoreError>;

    /// Every order, newest first.
    async fn list_all(&self) -> Result<Vec<OrderRecord>, StoreError>;

    /// Move an order forward. Unknown ids and rule violations come back as
    /// `StoreError::Rejected`.
    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<StatusChange, StoreError>;

    /// Whether `user_id` owns a `Delivered` order containing `product_id`.
    async fn has_delivered(&self, user_id: UserId, product_id: ProductId) -> Result<bool, StoreError>;

    async fn report(&self) -> Result<OrdersReport, StoreError>;
}

/// Run `UpdateStatus` against a stored record through the aggregate.
pub(crate) fn transition(
    record: OrderRecord,
    status: OrderStatus,
    at: DateTime<Utc>,
) -> Result<StatusChange, StoreError> {
    let order_id = record.id;
    let mut order = Order::restore(record);
    let mut events = order.execute(&OrderCommand::UpdateStatus(UpdateStatus {
        order_id,
        status,
        occurred_at: at,
    }))?;

    let event = events
        .pop()
        .ok_or_else(|| StoreError::corrupt(format!("status update on {order_id} produced no event")))?;
    let order = order
        .to_record()
        .ok_or_else(|| StoreError::corrupt(format!("order {order_id} lost its placement")))?;

    Ok(StatusChange { order, event })
}

pub(crate) fn newest_first(orders: &mut [OrderRecord]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
}
