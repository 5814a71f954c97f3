use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{Money, ProductId, ReviewId, UserId};
use storefront_events::Event;

pub const AGGREGATE_TYPE: &str = "catalog.product";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatalogEvent {
    ProductCreated {
        product_id: ProductId,
        name: String,
        price: Money,
        stock: u32,
        occurred_at: DateTime<Utc>,
    },
    StockReserved {
        product_id: ProductId,
        quantity: u32,
        remaining: u32,
        occurred_at: DateTime<Utc>,
    },
    StockReleased {
        product_id: ProductId,
        quantity: u32,
        stock: u32,
        occurred_at: DateTime<Utc>,
    },
    ProductRestocked {
        product_id: ProductId,
        quantity: u32,
        stock: u32,
        occurred_at: DateTime<Utc>,
    },
    ReviewAdded {
        product_id: ProductId,
        review_id: ReviewId,
        user_id: UserId,
        rating: u8,
        average_rating: f64,
        num_reviews: u32,
        occurred_at: DateTime<Utc>,
    },
}

impl CatalogEvent {
    pub fn product_id(&self) -> ProductId {
        match self {
            CatalogEvent::ProductCreated { product_id, .. }
            | CatalogEvent::StockReserved { product_id, .. }
            | CatalogEvent::StockReleased { product_id, .. }
            | CatalogEvent::ProductRestocked { product_id, .. }
            | CatalogEvent::ReviewAdded { product_id, .. } => *product_id,
        }
    }
}

impl Event for CatalogEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CatalogEvent::ProductCreated { .. } => "catalog.product.created",
            CatalogEvent::StockReserved { .. } => "catalog.product.stock_reserved",
            CatalogEvent::StockReleased { .. } => "catalog.product.stock_released",
            CatalogEvent::ProductRestocked { .. } => "catalog.product.restocked",
            CatalogEvent::ReviewAdded { .. } => "catalog.product.review_added",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CatalogEvent::ProductCreated { occurred_at, .. }
            | CatalogEvent::StockReserved { occurred_at, .. }
            | CatalogEvent::StockReleased { occurred_at, .. }
            | CatalogEvent::ProductRestocked { occurred_at, .. }
            | CatalogEvent::ReviewAdded { occurred_at, .. } => *occurred_at,
        }
    }
}
