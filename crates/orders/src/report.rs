use serde::{Deserialize, Serialize};

use storefront_core::{DomainResult, Money};

use crate::order::OrderRecord;

/// Store-wide sales figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrdersReport {
    pub total_orders: u64,
    pub total_sales: Money,
}

impl OrdersReport {
    pub fn from_orders<'a, I>(orders: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = &'a OrderRecord>,
    {
        orders.into_iter().try_fold(Self::default(), |acc, order| {
            Ok(Self {
                total_orders: acc.total_orders + 1,
                total_sales: acc.total_sales.checked_add(order.total_price)?,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use storefront_core::{OrderId, UserId};

    use crate::order::{OrderStatus, ShippingDetails};

    fn record(total_cents: i64) -> OrderRecord {
        let now = Utc::now();
        OrderRecord {
            id: OrderId::new(),
            user_id: UserId::new(),
            lines: vec![],
            shipping_details: ShippingDetails::default(),
            total_price: Money::from_minor(total_cents).unwrap(),
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    #[test]
    fn sums_every_order() {
        let orders = vec![record(2500), record(1050)];
        let report = OrdersReport::from_orders(&orders).unwrap();
        assert_eq!(report.total_orders, 2);
        assert_eq!(report.total_sales.amount(), Decimal::new(3550, 2));
    }

    #[test]
    fn empty_store_reports_zero() {
        assert_eq!(OrdersReport::from_orders(Vec::<OrderRecord>::new().iter()).unwrap(), OrdersReport::default());
    }
}
