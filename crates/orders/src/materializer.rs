//! Turns reserved cart lines into a placed, `Pending` order.

use chrono::{DateTime, Utc};

use storefront_catalog::ReservedLine;
use storefront_core::{Aggregate, DomainError, DomainResult, OrderId, UserId};

use crate::order::{Order, OrderCommand, OrderEvent, PlaceOrder, ShippingDetails};

/// A freshly placed order and the events that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order: Order,
    pub events: Vec<OrderEvent>,
}

/// Build the order for already-reserved lines.
///
/// Uses the unit prices captured during reservation; live catalog prices are
/// never consulted here. Persisting the result is the caller's job.
pub fn materialize(
    order_id: OrderId,
    user_id: UserId,
    lines: &[ReservedLine],
    shipping: ShippingDetails,
    now: DateTime<Utc>,
) -> DomainResult<PlacedOrder> {
    let mut order = Order::empty(order_id);
    let events = order.execute(&OrderCommand::PlaceOrder(PlaceOrder {
        order_id,
        user_id,
        lines: lines.to_vec(),
        shipping,
        occurred_at: now,
    }))?;

    if !order.is_placed() {
        return Err(DomainError::invariant("order was not placed"));
    }

    Ok(PlacedOrder { order, events })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use storefront_core::{Money, ProductId, Quantity};

    use crate::order::OrderStatus;

    fn line(qty: i64, cents: i64) -> ReservedLine {
        ReservedLine {
            product_id: ProductId::new(),
            product_name: "Widget".to_string(),
            quantity: Quantity::new(qty).unwrap(),
            unit_price: Money::from_minor(cents).unwrap(),
        }
    }

    #[test]
    fn two_tens_and_a_five_total_twenty_five() {
        let placed = materialize(
            OrderId::new(),
            UserId::new(),
            &[line(2, 1000), line(1, 500)],
            ShippingDetails::default(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(placed.order.total_price().amount(), Decimal::new(2500, 2));
        assert_eq!(placed.order.status(), OrderStatus::Pending);
        assert_eq!(placed.events.len(), 1);
    }

    #[test]
    fn shipping_snapshot_is_kept_verbatim() {
        let shipping = ShippingDetails {
            name: "Ada".to_string(),
            address: String::new(),
            phone: "555-0100".to_string(),
        };
        let placed = materialize(
            OrderId::new(),
            UserId::new(),
            &[line(1, 100)],
            shipping.clone(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(placed.order.shipping(), &shipping);
    }

    #[test]
    fn no_lines_is_a_validation_error() {
        let err = materialize(OrderId::new(), UserId::new(), &[], ShippingDetails::default(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
