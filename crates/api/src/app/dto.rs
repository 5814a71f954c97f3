//! Request bodies and JSON views of domain values.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};

use storefront_cart::Cart;
use storefront_catalog::Product;
use storefront_orders::{OrderRecord, OrdersReport, ShippingDetails};
use storefront_reviews::{Eligibility, Review};

#[derive(Debug, Deserialize)]
pub struct AddCartItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub shipping_details: Option<ShippingDetails>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitReviewRequest {
    /// Kept raw so `4.5`, `"5"` or a missing rating is an invalid rating, not a body error.
    #[serde(default)]
    pub rating: Value,
    #[serde(default)]
    pub comment: Option<String>,
}

impl SubmitReviewRequest {
    /// The rating when it is a JSON integer; range is checked by the review gate.
    pub fn integer_rating(&self) -> Option<i64> {
        self.rating.as_i64()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// Accepts `"19.99"` or `19.99`; checked for sign by `Money`.
    pub price: Decimal,
    #[serde(default)]
    pub stock: i64,
}

#[derive(Debug, Deserialize)]
pub struct RestockRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub fn product_to_json(product: &Product) -> Value {
    let details = product.details();
    let rating = product.rating();
    json!({
        "id": product.id(),
        "name": details.name,
        "description": details.description,
        "category": details.category,
        "price": product.price(),
        "stock": product.stock(),
        "rating": rating.average,
        "num_reviews": rating.count,
        "created_at": product.created_at(),
    })
}

pub fn cart_to_json(cart: &Cart) -> Value {
    json!({
        "user_id": cart.user_id(),
        "items": cart.lines().iter().map(|line| json!({
            "product_id": line.product_id,
            "quantity": line.quantity.get(),
        })).collect::<Vec<_>>(),
        "updated_at": cart.updated_at(),
    })
}

pub fn order_to_json(order: &OrderRecord) -> Value {
    json!({
        "id": order.id,
        "user_id": order.user_id,
        "status": order.status.as_str(),
        "items": order.lines.iter().map(|line| json!({
            "line_no": line.line_no,
            "product_id": line.product_id,
            "product_name": line.product_name,
            "quantity": line.quantity.get(),
            "unit_price": line.unit_price,
        })).collect::<Vec<_>>(),
        "shipping_details": order.shipping_details,
        "total_price": order.total_price,
        "created_at": order.created_at,
        "updated_at": order.updated_at,
    })
}

pub fn review_to_json(review: &Review) -> Value {
    json!({
        "id": review.id,
        "user_id": review.user_id,
        "name": review.author_name,
        "rating": review.rating.get(),
        "comment": review.comment,
        "created_at": review.created_at,
    })
}

pub fn eligibility_to_json(eligibility: Eligibility) -> Value {
    json!({
        "eligible": eligibility.eligible,
        "already_reviewed": eligibility.already_reviewed,
    })
}

pub fn report_to_json(report: &OrdersReport) -> Value {
    json!({
        "total_orders": report.total_orders,
        "total_sales": report.total_sales,
    })
}
