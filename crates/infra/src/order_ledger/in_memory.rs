use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use storefront_core::{DomainError, OrderId, ProductId, UserId};
use storefront_orders::{OrderRecord, OrderStatus, OrdersReport};

use super::r#trait::{OrderLedger, StatusChange, newest_first, transition};
use crate::error::StoreError;

#[derive(Debug, Default)]
pub struct InMemoryOrderLedger {
    orders: RwLock<HashMap<OrderId, OrderRecord>>,
}

impl InMemoryOrderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect<F>(&self, keep: F) -> Result<Vec<OrderRecord>, StoreError>
    where
        F: Fn(&OrderRecord) -> bool,
    {
        let orders = self.orders.read().map_err(|_| StoreError::Poisoned)?;
        let mut out: Vec<OrderRecord> = orders.values().filter(|o| keep(o)).cloned().collect();
        newest_first(&mut out);
        Ok(out)
    }
}

#[async_trait]
impl OrderLedger for InMemoryOrderLedger {
    async fn insert(&self, order: OrderRecord) -> Result<(), StoreError> {
        let mut orders = self.orders.write().map_err(|_| StoreError::Poisoned)?;
        if orders.contains_key(&order.id) {
            return Err(StoreError::Conflict {
                operation: "insert_order",
                message: format!("order {} already exists", order.id),
            });
        }
        orders.insert(order.id, order);
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Option<OrderRecord>, StoreError> {
        let orders = self.orders.read().map_err(|_| StoreError::Poisoned)?;
        Ok(orders.get(&id).cloned())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderRecord>, StoreError> {
        self.collect(|o| o.user_id == user_id)
    }

    async fn list_all(&self) -> Result<Vec<OrderRecord>, StoreError> {
        self.collect(|_| true)
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<StatusChange, StoreError> {
        let mut orders = self.orders.write().map_err(|_| StoreError::Poisoned)?;
        let current = orders.get(&id).cloned().ok_or(DomainError::NotFound("order"))?;
        let change = transition(current, status, at)?;
        orders.insert(id, change.order.clone());
        Ok(change)
    }

    async fn has_delivered(&self, user_id: UserId, product_id: ProductId) -> Result<bool, StoreError> {
        let orders = self.orders.read().map_err(|_| StoreError::Poisoned)?;
        Ok(orders.values().any(|o| {
            o.user_id == user_id
                && o.status == OrderStatus::Delivered
                && o.lines.iter().any(|l| l.product_id == product_id)
        }))
    }

    async fn report(&self) -> Result<OrdersReport, StoreError> {
        let orders = self.orders.read().map_err(|_| StoreError::Poisoned)?;
        Ok(OrdersReport::from_orders(orders.values())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use storefront_catalog::ReservedLine;
    use storefront_core::{Money, Quantity};
    use storefront_orders::{ShippingDetails, materialize};

    fn placed(user: UserId, product: ProductId, at: DateTime<Utc>) -> OrderRecord {
        let line = ReservedLine {
            product_id: product,
            product_name: "Kettle".to_string(),
            quantity: Quantity::new(2).unwrap(),
            unit_price: Money::from_minor(1250).unwrap(),
        };
        materialize(OrderId::new(), user, &[line], ShippingDetails::default(), at)
            .unwrap()
            .order
            .to_record()
            .unwrap()
    }

    #[tokio::test]
    async fn lists_newest_first_per_user() {
        let ledger = InMemoryOrderLedger::new();
        let (alice, bob, product) = (UserId::new(), UserId::new(), ProductId::new());
        let t0 = Utc::now();

        let older = placed(alice, product, t0);
        let newer = placed(alice, product, t0 + Duration::seconds(5));
        ledger.insert(older.clone()).await.unwrap();
        ledger.insert(newer.clone()).await.unwrap();
        ledger.insert(placed(bob, product, t0)).await.unwrap();

        let mine = ledger.list_for_user(alice).await.unwrap();
        assert_eq!(mine.iter().map(|o| o.id).collect::<Vec<_>>(), vec![newer.id, older.id]);
        assert_eq!(ledger.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn status_moves_forward_only() {
        let ledger = InMemoryOrderLedger::new();
        let (user, product) = (UserId::new(), ProductId::new());
        let order = placed(user, product, Utc::now());
        let id = order.id;
        ledger.insert(order).await.unwrap();

        assert!(!ledger.has_delivered(user, product).await.unwrap());
        let change = ledger.update_status(id, OrderStatus::Delivered, Utc::now()).await.unwrap();
        assert_eq!(change.order.status, OrderStatus::Delivered);
        assert!(ledger.has_delivered(user, product).await.unwrap());

        let back = ledger.update_status(id, OrderStatus::Shipped, Utc::now()).await;
        assert!(matches!(back, Err(StoreError::Rejected(DomainError::InvariantViolation(_)))));
        let same = ledger.update_status(id, OrderStatus::Delivered, Utc::now()).await;
        assert!(matches!(same, Err(StoreError::Rejected(DomainError::Conflict(_)))));
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let ledger = InMemoryOrderLedger::new();
        let err = ledger
            .update_status(OrderId::new(), OrderStatus::Shipped, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn report_sums_totals() {
        let ledger = InMemoryOrderLedger::new();
        let user = UserId::new();
        ledger.insert(placed(user, ProductId::new(), Utc::now())).await.unwrap();
        ledger.insert(placed(user, ProductId::new(), Utc::now())).await.unwrap();

        let report = ledger.report().await.unwrap();
        assert_eq!(report.total_orders, 2);
        assert_eq!(report.total_sales, Money::from_minor(5000).unwrap());
    }
}
