//! Catalog administration and browsing.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument};

use storefront_catalog::events::AGGREGATE_TYPE as PRODUCT_AGGREGATE;
use storefront_catalog::{CatalogEvent, Product, ProductDetails};
use storefront_core::{DomainError, ProductId, Quantity};
use storefront_reviews::Review;

use crate::catalog_store::CatalogStore;
use crate::error::StoreError;
use crate::publisher::EventPublisher;

#[derive(Debug, Error)]
pub enum CatalogServiceError {
    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error(transparent)]
    Invalid(DomainError),

    #[error("catalog storage failed: {0}")]
    Internal(StoreError),
}

impl From<StoreError> for CatalogServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Rejected(domain) => Self::Invalid(domain),
            other => Self::Internal(other),
        }
    }
}

pub struct CatalogService {
    catalog: Arc<dyn CatalogStore>,
    publisher: EventPublisher,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogStore>, publisher: EventPublisher) -> Self {
        Self { catalog, publisher }
    }

    #[instrument(skip(self, details), fields(name = %details.name), err)]
    pub async fn create_product(&self, details: ProductDetails, stock: i64) -> Result<Product, CatalogServiceError> {
        let stock = u32::try_from(stock).map_err(|_| {
            CatalogServiceError::Invalid(DomainError::validation(format!(
                "stock must be between 0 and {}, got {stock}",
                u32::MAX
            )))
        })?;
        let product =
            Product::create(ProductId::new(), details, stock, Utc::now()).map_err(CatalogServiceError::Invalid)?;
        self.catalog.insert(product.clone()).await?;

        info!(product_id = %product.id(), stock, "product created");
        self.publisher.publish(
            PRODUCT_AGGREGATE,
            product.id(),
            CatalogEvent::ProductCreated {
                product_id: product.id(),
                name: product.name().to_string(),
                price: product.price(),
                stock,
                occurred_at: product.created_at(),
            },
        );
        Ok(product)
    }

    /// Add units to a product's stock. Returns the new level.
    #[instrument(skip(self), fields(product_id = %product_id), err)]
    pub async fn restock(&self, product_id: ProductId, quantity: i64) -> Result<u32, CatalogServiceError> {
        let quantity = Quantity::new(quantity).map_err(CatalogServiceError::Invalid)?;
        let stock = self
            .catalog
            .add_stock(product_id, quantity)
            .await?
            .ok_or(CatalogServiceError::NotFound(product_id))?;

        self.publisher.publish(
            PRODUCT_AGGREGATE,
            product_id,
            CatalogEvent::ProductRestocked {
                product_id,
                quantity: quantity.get(),
                stock,
                occurred_at: Utc::now(),
            },
        );
        Ok(stock)
    }

    pub async fn get(&self, product_id: ProductId) -> Result<Product, CatalogServiceError> {
        self.catalog
            .get(product_id)
            .await?
            .ok_or(CatalogServiceError::NotFound(product_id))
    }

    pub async fn list(&self) -> Result<Vec<Product>, CatalogServiceError> {
        Ok(self.catalog.list().await?)
    }

    pub async fn reviews(&self, product_id: ProductId) -> Result<Vec<Review>, CatalogServiceError> {
        self.catalog
            .reviews(product_id)
            .await?
            .ok_or(CatalogServiceError::NotFound(product_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::Money;

    use crate::catalog_store::InMemoryCatalogStore;

    fn service() -> CatalogService {
        CatalogService::new(Arc::new(InMemoryCatalogStore::new()), EventPublisher::default())
    }

    fn details(name: &str) -> ProductDetails {
        ProductDetails {
            name: name.to_string(),
            description: "solid oak".to_string(),
            category: "furniture".to_string(),
            price: Money::from_minor(12000).unwrap(),
        }
    }

    #[tokio::test]
    async fn create_then_restock() {
        let service = service();
        let product = service.create_product(details("Table"), 2).await.unwrap();

        assert_eq!(service.restock(product.id(), 3).await.unwrap(), 5);
        assert_eq!(service.get(product.id()).await.unwrap().stock(), 5);
        assert_eq!(service.list().await.unwrap().len(), 1);
        assert!(service.reviews(product.id()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_bad_input() {
        let service = service();
        assert!(matches!(
            service.create_product(details("Table"), -1).await,
            Err(CatalogServiceError::Invalid(_))
        ));
        assert!(matches!(
            service.create_product(details("   "), 1).await,
            Err(CatalogServiceError::Invalid(_))
        ));

        let product = service.create_product(details("Table"), 1).await.unwrap();
        assert!(matches!(
            service.restock(product.id(), 0).await,
            Err(CatalogServiceError::Invalid(_))
        ));
        assert!(matches!(
            service.restock(ProductId::new(), 1).await,
            Err(CatalogServiceError::NotFound(_))
        ));
    }
}
