use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use storefront_core::{DomainError, DomainResult, Money, ProductId, Quantity};
use storefront_reviews::RatingSummary;

/// Descriptive, operator-editable product data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub price: Money,
}

impl ProductDetails {
    fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        Ok(())
    }
}

/// Flat, serializable view of a product (storage rows and API payloads).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: Money,
    pub stock: u32,
    pub rating: f64,
    pub num_reviews: u32,
    pub created_at: DateTime<Utc>,
}

/// Requested more units than are on hand.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Not enough stock for {product_name}. Available: {available}, requested: {requested}")]
pub struct StockShortfall {
    pub product_id: ProductId,
    pub product_name: String,
    pub available: u32,
    pub requested: u32,
}

/// A catalog product.
///
/// `stock` is unsigned: a take that would drive it below zero is refused
/// rather than clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    id: ProductId,
    details: ProductDetails,
    stock: u32,
    rating: RatingSummary,
    created_at: DateTime<Utc>,
}

impl Product {
    pub fn create(
        id: ProductId,
        details: ProductDetails,
        initial_stock: u32,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        details.validate()?;
        Ok(Self {
            id,
            details: ProductDetails {
                name: details.name.trim().to_string(),
                ..details
            },
            stock: initial_stock,
            rating: RatingSummary::default(),
            created_at: now,
        })
    }

    /// Rehydrate from storage. Stored rows are trusted.
    pub fn restore(record: ProductRecord) -> Self {
        Self {
            id: record.id,
            details: ProductDetails {
                name: record.name,
                description: record.description,
                category: record.category,
                price: record.price,
            },
            stock: record.stock,
            rating: RatingSummary {
                average: record.rating,
                count: record.num_reviews,
            },
            created_at: record.created_at,
        }
    }

    pub fn to_record(&self) -> ProductRecord {
        ProductRecord {
            id: self.id,
            name: self.details.name.clone(),
            description: self.details.description.clone(),
            category: self.details.category.clone(),
            price: self.details.price,
            stock: self.stock,
            rating: self.rating.average,
            num_reviews: self.rating.count,
            created_at: self.created_at,
        }
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.details.name
    }

    pub fn price(&self) -> Money {
        self.details.price
    }

    pub fn stock(&self) -> u32 {
        self.stock
    }

    pub fn rating(&self) -> RatingSummary {
        self.rating
    }

    pub fn details(&self) -> &ProductDetails {
        &self.details
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn shortfall(&self, requested: u32) -> StockShortfall {
        StockShortfall {
            product_id: self.id,
            product_name: self.details.name.clone(),
            available: self.stock,
            requested,
        }
    }

    /// Read-only availability check (the validation pass of a reservation).
    pub fn ensure_available(&self, requested: Quantity) -> Result<(), StockShortfall> {
        if self.stock < requested.get() {
            return Err(self.shortfall(requested.get()));
        }
        Ok(())
    }

    /// Conditional decrement: take `quantity` only if that many are on hand.
    /// Returns the remaining stock.
    pub fn take_stock(&mut self, quantity: Quantity) -> Result<u32, StockShortfall> {
        match self.stock.checked_sub(quantity.get()) {
            Some(remaining) => {
                self.stock = remaining;
                Ok(remaining)
            }
            None => Err(self.shortfall(quantity.get())),
        }
    }

    /// Increment (restock, or release of a reservation). Returns the new stock.
    pub fn add_stock(&mut self, quantity: Quantity) -> DomainResult<u32> {
        self.stock = self
            .stock
            .checked_add(quantity.get())
            .ok_or_else(|| DomainError::invariant("stock counter overflow"))?;
        Ok(self.stock)
    }

    pub fn set_rating(&mut self, summary: RatingSummary) {
        self.rating = summary;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn details(name: &str, price_cents: i64) -> ProductDetails {
        ProductDetails {
            name: name.to_string(),
            description: String::new(),
            category: "tools".to_string(),
            price: Money::from_minor(price_cents).unwrap(),
        }
    }

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn product(stock: u32) -> Product {
        Product::create(ProductId::new(), details("Hammer", 1000), stock, Utc::now()).unwrap()
    }

    #[test]
    fn create_rejects_blank_names() {
        let err = Product::create(ProductId::new(), details("  ", 100), 1, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn create_starts_without_reviews() {
        let p = product(3);
        assert_eq!(p.stock(), 3);
        assert_eq!(p.rating(), RatingSummary::default());
        assert_eq!(p.price().amount(), Decimal::new(1000, 2));
    }

    #[test]
    fn take_stock_refuses_to_go_negative() {
        let mut p = product(3);
        assert_eq!(p.take_stock(qty(2)), Ok(1));

        let err = p.take_stock(qty(2)).unwrap_err();
        assert_eq!(err.available, 1);
        assert_eq!(err.requested, 2);
        assert_eq!(p.stock(), 1);
    }

    #[test]
    fn shortfall_message_names_product_and_amounts() {
        let p = product(1);
        let err = p.ensure_available(qty(4)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Not enough stock for Hammer. Available: 1, requested: 4"
        );
    }

    #[test]
    fn restore_round_trips_record() {
        let mut p = product(5);
        p.set_rating(RatingSummary { average: 4.5, count: 2 });
        let restored = Product::restore(p.to_record());
        assert_eq!(restored, p);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Take(u32),
            Add(u32),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (1u32..20).prop_map(Op::Take),
                (1u32..20).prop_map(Op::Add),
            ]
        }

        proptest! {
            /// Stock tracks a simple model and never underflows.
            #[test]
            fn stock_never_goes_negative(initial in 0u32..50, ops in proptest::collection::vec(op(), 0..100)) {
                let mut p = product(initial);
                let mut model = i64::from(initial);

                for op in ops {
                    match op {
                        Op::Take(n) => {
                            let taken = p.take_stock(qty(i64::from(n)));
                            if model >= i64::from(n) {
                                prop_assert!(taken.is_ok());
                                model -= i64::from(n);
                            } else {
                                prop_assert!(taken.is_err());
                            }
                        }
                        Op::Add(n) => {
                            p.add_stock(qty(i64::from(n))).unwrap();
                            model += i64::from(n);
                        }
                    }
                    prop_assert!(model >= 0);
                    prop_assert_eq!(i64::from(p.stock()), model);
                }
            }
        }
    }
}
