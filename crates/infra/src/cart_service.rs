//! Cart editing on behalf of a user.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use storefront_cart::Cart;
use storefront_core::{DomainError, ProductId, Quantity, UserId};

use crate::cart_store::CartStore;
use crate::catalog_store::CatalogStore;
use crate::error::StoreError;

#[derive(Debug, Error)]
pub enum CartServiceError {
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("product {0} is not in the cart")]
    LineNotFound(ProductId),

    #[error(transparent)]
    Invalid(DomainError),

    #[error("cart storage failed: {0}")]
    Internal(StoreError),
}

impl From<StoreError> for CartServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Rejected(domain) => Self::Invalid(domain),
            other => Self::Internal(other),
        }
    }
}

pub struct CartService {
    carts: Arc<dyn CartStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { carts, catalog }
    }

    pub async fn view(&self, user_id: UserId) -> Result<Cart, CartServiceError> {
        Ok(self.carts.load(user_id).await?)
    }

    /// Stock is not checked here; checkout is where availability counts.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id), err)]
    pub async fn add(&self, user_id: UserId, product_id: ProductId, quantity: i64) -> Result<Cart, CartServiceError> {
        let quantity = Quantity::new(quantity).map_err(CartServiceError::Invalid)?;
        if self.catalog.get(product_id).await?.is_none() {
            return Err(CartServiceError::ProductNotFound(product_id));
        }
        Ok(self.carts.add_line(user_id, product_id, quantity).await?)
    }

    pub async fn update(&self, user_id: UserId, product_id: ProductId, quantity: i64) -> Result<Cart, CartServiceError> {
        let quantity = Quantity::new(quantity).map_err(CartServiceError::Invalid)?;
        match self.carts.set_quantity(user_id, product_id, quantity).await {
            Err(StoreError::Rejected(DomainError::NotFound(_))) => Err(CartServiceError::LineNotFound(product_id)),
            other => Ok(other?),
        }
    }

    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<Cart, CartServiceError> {
        Ok(self.carts.remove_line(user_id, product_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use storefront_catalog::{Product, ProductDetails};
    use storefront_core::Money;

    use crate::cart_store::InMemoryCartStore;
    use crate::catalog_store::InMemoryCatalogStore;

    async fn setup() -> (CartService, ProductId) {
        let catalog = Arc::new(InMemoryCatalogStore::new());
        let product = Product::create(
            ProductId::new(),
            ProductDetails {
                name: "Pen".to_string(),
                description: String::new(),
                category: String::new(),
                price: Money::from_minor(150).unwrap(),
            },
            0,
            Utc::now(),
        )
        .unwrap();
        let id = product.id();
        catalog.insert(product).await.unwrap();
        (CartService::new(Arc::new(InMemoryCartStore::new()), catalog), id)
    }

    #[tokio::test]
    async fn add_update_remove() {
        let (service, pen) = setup().await;
        let user = UserId::new();

        service.add(user, pen, 2).await.unwrap();
        let cart = service.update(user, pen, 5).await.unwrap();
        assert_eq!(cart.quantity_of(pen).map(|q| q.get()), Some(5));

        let cart = service.remove(user, pen).await.unwrap();
        assert!(cart.is_empty());
        assert!(service.view(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_unknown_products_and_lines() {
        let (service, pen) = setup().await;
        let user = UserId::new();

        assert!(matches!(
            service.add(user, ProductId::new(), 1).await,
            Err(CartServiceError::ProductNotFound(_))
        ));
        assert!(matches!(service.add(user, pen, 0).await, Err(CartServiceError::Invalid(_))));
        assert!(matches!(
            service.update(user, pen, 1).await,
            Err(CartServiceError::LineNotFound(_))
        ));
    }
}
