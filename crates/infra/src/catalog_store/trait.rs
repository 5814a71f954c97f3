use async_trait::async_trait;

use storefront_catalog::Product;
use storefront_core::{ProductId, Quantity, UserId};
use storefront_reviews::{RatingSummary, Review};

use crate::error::StoreError;

/// Outcome of a conditional stock decrement.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StockTake {
    /// Stock was decremented; `remaining` is the new counter value.
    Taken { remaining: u32 },
    /// Fewer than the requested units were on hand; nothing changed.
    Insufficient { available: u32 },
    /// No such product.
    Missing,
}

/// Outcome of a conditional review append.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ReviewAppend {
    /// Stored; the product's summary after recomputation.
    Appended(RatingSummary),
    /// The user already has a review on this product; nothing changed.
    Duplicate,
    /// No such product.
    Missing,
}

/// Catalog persistence.
///
/// `try_take_stock` and `append_review` are the two conditional writes the
/// checkout and review paths rely on. Each must be a single atomic step in the
/// backend: no caller ever reads a value and writes it back.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert(&self, product: Product) -> Result<(), StoreError>;

    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// All products, oldest first.
    async fn list(&self) -> Result<Vec<Product>, StoreError>;

    /// Decrement by `quantity` only if at least that many are on hand.
    async fn try_take_stock(&self, id: ProductId, quantity: Quantity) -> Result<StockTake, StoreError>;

    /// Increment (restock or reservation release). `None` if the product is missing.
    async fn add_stock(&self, id: ProductId, quantity: Quantity) -> Result<Option<u32>, StoreError>;

    /// Reviews oldest first. `None` if the product is missing.
    async fn reviews(&self, id: ProductId) -> Result<Option<Vec<Review>>, StoreError>;

    async fn has_review(&self, id: ProductId, user_id: UserId) -> Result<bool, StoreError>;

    /// Insert unless `(product, review.user_id)` already has a review, then
    /// recompute the product's mean rating and count over the full collection.
    async fn append_review(&self, id: ProductId, review: Review) -> Result<ReviewAppend, StoreError>;
}
