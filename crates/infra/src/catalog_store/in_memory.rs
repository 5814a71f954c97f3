use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use storefront_catalog::Product;
use storefront_core::{ProductId, Quantity, UserId};
use storefront_reviews::{Review, ReviewCollection};

use super::r#trait::{CatalogStore, ReviewAppend, StockTake};
use crate::error::StoreError;

#[derive(Debug)]
struct Entry {
    product: Product,
    reviews: ReviewCollection,
}

/// In-memory catalog.
///
/// Every conditional write runs under the single write lock, which is what
/// makes check-and-decrement (and check-and-append) atomic here.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    entries: RwLock<HashMap<ProductId, Entry>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stock, bypassing the async trait (tests and benches).
    pub fn stock_of(&self, id: ProductId) -> Option<u32> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(&id).map(|e| e.product.stock()))
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn insert(&self, product: Product) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        if entries.contains_key(&product.id()) {
            return Err(StoreError::Conflict {
                operation: "insert_product",
                message: format!("product {} already exists", product.id()),
            });
        }
        entries.insert(
            product.id(),
            Entry {
                product,
                reviews: ReviewCollection::new(),
            },
        );
        Ok(())
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(&id).map(|e| e.product.clone()))
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        let mut products: Vec<Product> = entries.values().map(|e| e.product.clone()).collect();
        products.sort_by_key(|p| (p.created_at(), p.id()));
        Ok(products)
    }

    async fn try_take_stock(&self, id: ProductId, quantity: Quantity) -> Result<StockTake, StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        let Some(entry) = entries.get_mut(&id) else {
            return Ok(StockTake::Missing);
        };
        Ok(match entry.product.take_stock(quantity) {
            Ok(remaining) => StockTake::Taken { remaining },
            Err(shortfall) => StockTake::Insufficient {
                available: shortfall.available,
            },
        })
    }

    async fn add_stock(&self, id: ProductId, quantity: Quantity) -> Result<Option<u32>, StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        match entries.get_mut(&id) {
            Some(entry) => Ok(Some(entry.product.add_stock(quantity)?)),
            None => Ok(None),
        }
    }

    async fn reviews(&self, id: ProductId) -> Result<Option<Vec<Review>>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(&id).map(|e| e.reviews.reviews().to_vec()))
    }

    async fn has_review(&self, id: ProductId, user_id: UserId) -> Result<bool, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries
            .get(&id)
            .is_some_and(|e| e.reviews.contains_user(user_id)))
    }

    async fn append_review(&self, id: ProductId, review: Review) -> Result<ReviewAppend, StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        let Some(entry) = entries.get_mut(&id) else {
            return Ok(ReviewAppend::Missing);
        };
        match entry.reviews.append(review) {
            Ok(summary) => {
                entry.product.set_rating(summary);
                Ok(ReviewAppend::Appended(summary))
            }
            Err(_duplicate) => Ok(ReviewAppend::Duplicate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use storefront_catalog::ProductDetails;
    use storefront_core::Money;
    use storefront_reviews::ReviewDraft;

    fn product(stock: u32) -> Product {
        Product::create(
            ProductId::new(),
            ProductDetails {
                name: "Lamp".to_string(),
                description: String::new(),
                category: String::new(),
                price: Money::from_minor(1500).unwrap(),
            },
            stock,
            Utc::now(),
        )
        .unwrap()
    }

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn review(user: UserId, stars: i64) -> Review {
        ReviewDraft::new(stars, None).unwrap().into_review(user, "tester", Utc::now())
    }

    #[tokio::test]
    async fn take_stock_is_conditional() {
        let store = InMemoryCatalogStore::new();
        let p = product(3);
        let id = p.id();
        store.insert(p).await.unwrap();

        assert_eq!(store.try_take_stock(id, qty(2)).await.unwrap(), StockTake::Taken { remaining: 1 });
        assert_eq!(
            store.try_take_stock(id, qty(2)).await.unwrap(),
            StockTake::Insufficient { available: 1 }
        );
        assert_eq!(store.stock_of(id), Some(1));
        assert_eq!(
            store.try_take_stock(ProductId::new(), qty(1)).await.unwrap(),
            StockTake::Missing
        );
    }

    #[tokio::test]
    async fn add_stock_reports_new_level() {
        let store = InMemoryCatalogStore::new();
        let p = product(0);
        let id = p.id();
        store.insert(p).await.unwrap();

        assert_eq!(store.add_stock(id, qty(4)).await.unwrap(), Some(4));
        assert_eq!(store.add_stock(ProductId::new(), qty(4)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_insert_conflicts() {
        let store = InMemoryCatalogStore::new();
        let p = product(1);
        store.insert(p.clone()).await.unwrap();
        assert!(matches!(store.insert(p).await, Err(StoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn append_review_recomputes_product_rating_once_per_user() {
        let store = InMemoryCatalogStore::new();
        let p = product(1);
        let id = p.id();
        store.insert(p).await.unwrap();
        let (alice, bob) = (UserId::new(), UserId::new());

        store.append_review(id, review(alice, 5)).await.unwrap();
        let appended = store.append_review(id, review(bob, 3)).await.unwrap();
        let duplicate = store.append_review(id, review(alice, 1)).await.unwrap();

        match appended {
            ReviewAppend::Appended(summary) => {
                assert_eq!(summary.count, 2);
                assert!((summary.average - 4.0).abs() < f64::EPSILON);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(duplicate, ReviewAppend::Duplicate);

        let stored = store.get(id).await.unwrap().unwrap();
        assert_eq!(stored.rating().count, 2);
        assert!(store.has_review(id, alice).await.unwrap());
        assert_eq!(store.reviews(id).await.unwrap().unwrap().len(), 2);
    }
}
