//! Order status desk and order queries.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument};

use storefront_core::{DomainError, OrderId, UserId};
use storefront_orders::{AGGREGATE_TYPE as ORDER_AGGREGATE, OrderRecord, OrderStatus, OrdersReport};

use crate::error::StoreError;
use crate::order_ledger::OrderLedger;
use crate::publisher::EventPublisher;

#[derive(Debug, Error)]
pub enum FulfillmentError {
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("not allowed to view order {0}")]
    Forbidden(OrderId),

    /// The order already has the requested status.
    #[error("{0}")]
    Conflict(String),

    /// The requested status is behind the current one.
    #[error("{0}")]
    InvalidTransition(String),

    #[error("order storage failed: {0}")]
    Internal(StoreError),
}

impl FulfillmentError {
    fn from_store(order_id: OrderId, err: StoreError) -> Self {
        match err {
            StoreError::Rejected(DomainError::NotFound(_)) => Self::OrderNotFound(order_id),
            StoreError::Rejected(DomainError::Conflict(msg)) => Self::Conflict(msg),
            StoreError::Rejected(DomainError::InvariantViolation(msg) | DomainError::Validation(msg)) => {
                Self::InvalidTransition(msg)
            }
            other => Self::Internal(other),
        }
    }
}

impl From<StoreError> for FulfillmentError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err)
    }
}

pub struct FulfillmentService {
    ledger: Arc<dyn OrderLedger>,
    publisher: EventPublisher,
}

impl FulfillmentService {
    pub fn new(ledger: Arc<dyn OrderLedger>, publisher: EventPublisher) -> Self {
        Self { ledger, publisher }
    }

    /// Advance an order. Pending → Shipped → Delivered, skipping allowed,
    /// never backwards.
    #[instrument(skip(self), fields(order_id = %order_id, status = %status), err)]
    pub async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<OrderRecord, FulfillmentError> {
        let change = self
            .ledger
            .update_status(order_id, status, Utc::now())
            .await
            .map_err(|e| FulfillmentError::from_store(order_id, e))?;

        info!(user_id = %change.order.user_id, "order status updated");
        self.publisher.publish(ORDER_AGGREGATE, order_id, change.event);
        Ok(change.order)
    }

    /// An order as seen by `viewer`: owners and administrators only.
    pub async fn order_for(
        &self,
        order_id: OrderId,
        viewer: UserId,
        is_admin: bool,
    ) -> Result<OrderRecord, FulfillmentError> {
        let order = self
            .ledger
            .get(order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id))?;
        if order.user_id != viewer && !is_admin {
            return Err(FulfillmentError::Forbidden(order_id));
        }
        Ok(order)
    }

    pub async fn orders_of(&self, user_id: UserId) -> Result<Vec<OrderRecord>, FulfillmentError> {
        Ok(self.ledger.list_for_user(user_id).await?)
    }

    pub async fn all_orders(&self) -> Result<Vec<OrderRecord>, FulfillmentError> {
        Ok(self.ledger.list_all().await?)
    }

    pub async fn report(&self) -> Result<OrdersReport, FulfillmentError> {
        Ok(self.ledger.report().await?)
    }
}
