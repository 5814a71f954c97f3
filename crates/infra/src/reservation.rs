//! All-or-nothing stock reservation over a set of line requests.
//!
//! Two passes:
//! 1. **Validate**: resolve every product, check every quantity, merge
//!    duplicate products and check availability. Nothing is written; the
//!    name and unit price of each product are captured here.
//! 2. **Commit**: one conditional decrement per line. If a concurrent buyer
//!    wins the race for any line, the lines already taken in this pass are
//!    put back before the error is returned.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, instrument, warn};

use storefront_catalog::{CatalogEvent, LineRequest, Product, ReservedLine, StockShortfall};
use storefront_core::{ProductId, Quantity};

use crate::catalog_store::{CatalogStore, StockTake};
use crate::error::StoreError;

#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("nothing to reserve")]
    Empty,

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("invalid quantity {quantity} for product {product_id}: must be a positive integer")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },

    #[error(transparent)]
    InsufficientStock(#[from] StockShortfall),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A partial commit could not be fully rolled back; the listed lines are
    /// still out of stock and need manual reconciliation.
    #[error("{cause}; {} line(s) could not be returned to stock", .unreleased.len())]
    RollbackIncomplete {
        cause: Box<ReservationError>,
        unreleased: Vec<ReservedLine>,
    },
}

/// Stock that has been taken for one checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    lines: Vec<ReservedLine>,
    remaining: Vec<u32>,
}

impl Reservation {
    pub fn lines(&self) -> &[ReservedLine] {
        &self.lines
    }

    /// `StockReserved` facts, one per line, with the stock left after the take.
    pub fn events(&self, now: DateTime<Utc>) -> Vec<CatalogEvent> {
        self.lines
            .iter()
            .zip(&self.remaining)
            .map(|(line, remaining)| CatalogEvent::StockReserved {
                product_id: line.product_id,
                quantity: line.quantity.get(),
                remaining: *remaining,
                occurred_at: now,
            })
            .collect()
    }
}

/// Result of putting reserved stock back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseOutcome {
    /// Lines returned to stock, with the stock level afterwards.
    pub released: Vec<(ReservedLine, u32)>,
    /// Lines that could not be returned and need manual reconciliation.
    pub unreleased: Vec<ReservedLine>,
}

impl ReleaseOutcome {
    pub fn is_complete(&self) -> bool {
        self.unreleased.is_empty()
    }

    pub fn events(&self, now: DateTime<Utc>) -> Vec<CatalogEvent> {
        self.released
            .iter()
            .map(|(line, stock)| CatalogEvent::StockReleased {
                product_id: line.product_id,
                quantity: line.quantity.get(),
                stock: *stock,
                occurred_at: now,
            })
            .collect()
    }
}

struct Validated {
    product: Product,
    quantity: Quantity,
}

#[derive(Clone)]
pub struct StockReservation {
    catalog: Arc<dyn CatalogStore>,
}

impl StockReservation {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog }
    }

    /// Reserve every requested line or none of them.
    #[instrument(skip(self, requests), fields(lines = requests.len()), err)]
    pub async fn reserve(&self, requests: &[LineRequest]) -> Result<Reservation, ReservationError> {
        if requests.is_empty() {
            return Err(ReservationError::Empty);
        }

        let validated = self.validate(requests).await?;
        self.commit(validated).await
    }

    async fn validate(&self, requests: &[LineRequest]) -> Result<Vec<Validated>, ReservationError> {
        let mut order: Vec<ProductId> = Vec::new();
        let mut by_product: HashMap<ProductId, Validated> = HashMap::new();

        for request in requests {
            let product_id = request.product_id;
            let fresh = if by_product.contains_key(&product_id) {
                None
            } else {
                Some(
                    self.catalog
                        .get(product_id)
                        .await?
                        .ok_or(ReservationError::ProductNotFound(product_id))?,
                )
            };

            let invalid = || ReservationError::InvalidQuantity {
                product_id,
                quantity: request.quantity,
            };
            let quantity = Quantity::new(request.quantity).map_err(|_| invalid())?;

            match fresh {
                Some(product) => {
                    order.push(product_id);
                    by_product.insert(product_id, Validated { product, quantity });
                }
                None => {
                    if let Some(seen) = by_product.get_mut(&product_id) {
                        seen.quantity = seen.quantity.checked_add(quantity).map_err(|_| invalid())?;
                    }
                }
            }
        }

        let mut validated = Vec::with_capacity(order.len());
        for product_id in order {
            if let Some(line) = by_product.remove(&product_id) {
                line.product.ensure_available(line.quantity)?;
                validated.push(line);
            }
        }
        Ok(validated)
    }

    async fn commit(&self, validated: Vec<Validated>) -> Result<Reservation, ReservationError> {
        let mut taken: Vec<ReservedLine> = Vec::with_capacity(validated.len());
        let mut remaining: Vec<u32> = Vec::with_capacity(validated.len());

        for Validated { product, quantity } in validated {
            let outcome = self.catalog.try_take_stock(product.id(), quantity).await;

            let failure = match outcome {
                Ok(StockTake::Taken { remaining: left }) => {
                    taken.push(ReservedLine {
                        product_id: product.id(),
                        product_name: product.name().to_string(),
                        quantity,
                        unit_price: product.price(),
                    });
                    remaining.push(left);
                    continue;
                }
                Ok(StockTake::Insufficient { available }) => {
                    ReservationError::InsufficientStock(StockShortfall {
                        product_id: product.id(),
                        product_name: product.name().to_string(),
                        available,
                        requested: quantity.get(),
                    })
                }
                Ok(StockTake::Missing) => ReservationError::ProductNotFound(product.id()),
                Err(err) => ReservationError::Store(err),
            };

            if !taken.is_empty() {
                warn!(
                    product_id = %product.id(),
                    taken = taken.len(),
                    error = %failure,
                    "reservation lost a race mid-commit; returning taken lines"
                );
                // Nothing was announced as reserved, so a clean rollback publishes nothing.
                let rollback = self.release(&taken).await;
                if !rollback.is_complete() {
                    let unreleased: Vec<String> = rollback
                        .unreleased
                        .iter()
                        .map(|l| format!("{}x{}", l.product_id, l.quantity))
                        .collect();
                    error!(
                        unreleased = ?unreleased,
                        "reservation rollback incomplete: stock must be reconciled manually"
                    );
                    return Err(ReservationError::RollbackIncomplete {
                        cause: Box::new(failure),
                        unreleased: rollback.unreleased,
                    });
                }
            }
            return Err(failure);
        }

        Ok(Reservation { lines: taken, remaining })
    }

    /// Put reserved lines back into stock. Never fails as a whole: every line
    /// is attempted and the ones that could not be returned are reported.
    pub async fn release(&self, lines: &[ReservedLine]) -> ReleaseOutcome {
        let mut outcome = ReleaseOutcome::default();

        for line in lines {
            match self.catalog.add_stock(line.product_id, line.quantity).await {
                Ok(Some(stock)) => outcome.released.push((line.clone(), stock)),
                Ok(None) => {
                    error!(
                        product_id = %line.product_id,
                        quantity = line.quantity.get(),
                        "cannot release stock: product no longer exists"
                    );
                    outcome.unreleased.push(line.clone());
                }
                Err(err) => {
                    error!(
                        product_id = %line.product_id,
                        quantity = line.quantity.get(),
                        error = %err,
                        "stock release failed"
                    );
                    outcome.unreleased.push(line.clone());
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_catalog::ProductDetails;
    use storefront_core::Money;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use storefront_core::UserId;
    use storefront_reviews::Review;

    use crate::catalog_store::{InMemoryCatalogStore, ReviewAppend};

    /// Catalog whose second stock take loses to a buyer who drains that
    /// product first; optionally refuses to put stock back.
    struct RacedCatalog {
        inner: Arc<InMemoryCatalogStore>,
        takes: AtomicUsize,
        rival_takes: u32,
        refuse_returns: bool,
    }

    impl RacedCatalog {
        fn new(inner: Arc<InMemoryCatalogStore>, rival_takes: u32) -> Self {
            Self { inner, takes: AtomicUsize::new(0), rival_takes, refuse_returns: false }
        }
    }

    #[async_trait]
    impl CatalogStore for RacedCatalog {
        async fn insert(&self, product: Product) -> Result<(), StoreError> {
            self.inner.insert(product).await
        }

        async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
            self.inner.get(id).await
        }

        async fn list(&self) -> Result<Vec<Product>, StoreError> {
            self.inner.list().await
        }

        async fn try_take_stock(&self, id: ProductId, quantity: Quantity) -> Result<StockTake, StoreError> {
            if self.takes.fetch_add(1, Ordering::SeqCst) == 1 {
                let rival = Quantity::new(i64::from(self.rival_takes)).unwrap();
                self.inner.try_take_stock(id, rival).await?;
            }
            self.inner.try_take_stock(id, quantity).await
        }

        async fn add_stock(&self, id: ProductId, quantity: Quantity) -> Result<Option<u32>, StoreError> {
            if self.refuse_returns {
                return Err(StoreError::Database {
                    operation: "add_stock",
                    message: "connection reset".to_string(),
                });
            }
            self.inner.add_stock(id, quantity).await
        }

        async fn reviews(&self, id: ProductId) -> Result<Option<Vec<Review>>, StoreError> {
            self.inner.reviews(id).await
        }

        async fn has_review(&self, id: ProductId, user_id: UserId) -> Result<bool, StoreError> {
            self.inner.has_review(id, user_id).await
        }

        async fn append_review(&self, id: ProductId, review: Review) -> Result<ReviewAppend, StoreError> {
            self.inner.append_review(id, review).await
        }
    }

    async fn seed(store: &InMemoryCatalogStore, name: &str, cents: i64, stock: u32) -> ProductId {
        let product = Product::create(
            ProductId::new(),
            ProductDetails {
                name: name.to_string(),
                description: String::new(),
                category: String::new(),
                price: Money::from_minor(cents).unwrap(),
            },
            stock,
            Utc::now(),
        )
        .unwrap();
        let id = product.id();
        store.insert(product).await.unwrap();
        id
    }

    fn setup() -> (Arc<InMemoryCatalogStore>, StockReservation) {
        let store = Arc::new(InMemoryCatalogStore::new());
        let reservation = StockReservation::new(store.clone());
        (store, reservation)
    }

    #[tokio::test]
    async fn reserves_all_lines_and_captures_prices() {
        let (store, reservation) = setup();
        let a = seed(&store, "A", 1000, 5).await;
        let b = seed(&store, "B", 500, 1).await;

        let reserved = reservation
            .reserve(&[LineRequest::new(a, 2), LineRequest::new(b, 1)])
            .await
            .unwrap();

        assert_eq!(reserved.lines().len(), 2);
        assert_eq!(reserved.lines()[0].unit_price, Money::from_minor(1000).unwrap());
        assert_eq!(store.stock_of(a), Some(3));
        assert_eq!(store.stock_of(b), Some(0));
        assert_eq!(reserved.events(Utc::now()).len(), 2);
    }

    #[tokio::test]
    async fn shortfall_on_any_line_reserves_nothing() {
        let (store, reservation) = setup();
        let a = seed(&store, "A", 1000, 5).await;
        let b = seed(&store, "Bolt", 500, 1).await;

        let err = reservation
            .reserve(&[LineRequest::new(a, 2), LineRequest::new(b, 3)])
            .await
            .unwrap_err();

        match err {
            ReservationError::InsufficientStock(s) => {
                assert_eq!(s.product_id, b);
                assert_eq!((s.available, s.requested), (1, 3));
                assert_eq!(s.to_string(), "Not enough stock for Bolt. Available: 1, requested: 3");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.stock_of(a), Some(5));
        assert_eq!(store.stock_of(b), Some(1));
    }

    #[tokio::test]
    async fn rejects_unknown_products_and_bad_quantities() {
        let (store, reservation) = setup();
        let a = seed(&store, "A", 1000, 5).await;
        let ghost = ProductId::new();

        assert!(matches!(
            reservation.reserve(&[LineRequest::new(ghost, 1)]).await,
            Err(ReservationError::ProductNotFound(id)) if id == ghost
        ));
        assert!(matches!(
            reservation.reserve(&[LineRequest::new(a, 0)]).await,
            Err(ReservationError::InvalidQuantity { quantity: 0, .. })
        ));
        assert!(matches!(
            reservation.reserve(&[LineRequest::new(a, -3)]).await,
            Err(ReservationError::InvalidQuantity { quantity: -3, .. })
        ));
        assert!(matches!(reservation.reserve(&[]).await, Err(ReservationError::Empty)));
        assert_eq!(store.stock_of(a), Some(5));
    }

    #[tokio::test]
    async fn duplicate_requests_are_checked_as_one_line() {
        let (store, reservation) = setup();
        let a = seed(&store, "A", 1000, 3).await;

        let err = reservation
            .reserve(&[LineRequest::new(a, 2), LineRequest::new(a, 2)])
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::InsufficientStock(s) if s.requested == 4));

        let ok = reservation
            .reserve(&[LineRequest::new(a, 1), LineRequest::new(a, 2)])
            .await
            .unwrap();
        assert_eq!(ok.lines().len(), 1);
        assert_eq!(ok.lines()[0].quantity.get(), 3);
        assert_eq!(store.stock_of(a), Some(0));
    }

    #[tokio::test]
    async fn release_returns_stock() {
        let (store, reservation) = setup();
        let a = seed(&store, "A", 1000, 3).await;

        let reserved = reservation.reserve(&[LineRequest::new(a, 2)]).await.unwrap();
        let outcome = reservation.release(reserved.lines()).await;

        assert!(outcome.is_complete());
        assert_eq!(outcome.released[0].1, 3);
        assert_eq!(store.stock_of(a), Some(3));
    }

    #[tokio::test]
    async fn losing_a_race_mid_commit_returns_the_lines_already_taken() {
        let store = Arc::new(InMemoryCatalogStore::new());
        let a = seed(&store, "A", 1000, 5).await;
        let b = seed(&store, "Bolt", 500, 3).await;
        let reservation = StockReservation::new(Arc::new(RacedCatalog::new(store.clone(), 3)));

        let err = reservation
            .reserve(&[LineRequest::new(a, 2), LineRequest::new(b, 1)])
            .await
            .unwrap_err();

        match err {
            ReservationError::InsufficientStock(s) => {
                assert_eq!(s.product_id, b);
                assert_eq!((s.available, s.requested), (0, 1));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.stock_of(a), Some(5));
        assert_eq!(store.stock_of(b), Some(0));
    }

    #[tokio::test]
    async fn failed_rollback_reports_the_stranded_lines() {
        let store = Arc::new(InMemoryCatalogStore::new());
        let a = seed(&store, "A", 1000, 5).await;
        let b = seed(&store, "Bolt", 500, 3).await;
        let mut raced = RacedCatalog::new(store.clone(), 2);
        raced.refuse_returns = true;
        let reservation = StockReservation::new(Arc::new(raced));

        let err = reservation
            .reserve(&[LineRequest::new(a, 2), LineRequest::new(b, 2)])
            .await
            .unwrap_err();

        match err {
            ReservationError::RollbackIncomplete { cause, unreleased } => {
                assert!(matches!(*cause, ReservationError::InsufficientStock(ref s) if s.available == 1));
                assert_eq!(unreleased.len(), 1);
                assert_eq!(unreleased[0].product_id, a);
                assert_eq!(unreleased[0].quantity.get(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.stock_of(a), Some(3));
    }
}
