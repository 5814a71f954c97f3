//! Catalog domain: products, their stock counter and rating summary.

pub mod events;
pub mod product;
pub mod reservation;

pub use events::CatalogEvent;
pub use product::{Product, ProductDetails, ProductRecord, StockShortfall};
pub use reservation::{LineRequest, ReservedLine};
