//! Value types exchanged with the stock reservation step.

use serde::{Deserialize, Serialize};

use storefront_core::{Money, ProductId, Quantity};

/// One requested (product, quantity) pair.
///
/// The quantity is kept raw so that a non-positive request is reported as
/// such by the reservation's validation pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl LineRequest {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self { product_id, quantity }
    }
}

/// A line whose stock has been taken, with the price and name captured at
/// validation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: Quantity,
    pub unit_price: Money,
}
