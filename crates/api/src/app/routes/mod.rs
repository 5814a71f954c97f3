use std::str::FromStr;

use axum::{
    Json, Router,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
};

use storefront_core::DomainError;

use crate::app::errors::{json_error, json_rejection_to_response};

pub mod admin;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod products;
pub mod system;

/// Routes open to anonymous shoppers.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/products", get(products::list_products))
        .route("/products/:id", get(products::get_product))
        .route("/products/:id/reviews", get(products::list_reviews))
}

/// Routes that require a verified bearer token.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/cart", get(cart::view_cart))
        .route("/cart/items", post(cart::add_item))
        .route("/cart/items/:product_id", put(cart::update_item).delete(cart::remove_item))
        .route("/checkout", post(checkout::checkout))
        .route("/orders", get(orders::my_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/products/:id/reviews", post(products::submit_review))
        .route("/products/:id/reviews/can-review", get(products::can_review))
        .nest("/admin", admin::router())
}

/// Parse a path or body identifier, answering 400 when it is malformed.
pub(crate) fn parse_id<T>(raw: &str) -> Result<T, Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse::<T>()
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}


/// Unwrap a JSON body, answering with the JSON error shape when it was rejected.
pub(crate) fn read_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload.map(|Json(body)| body).map_err(json_rejection_to_response)
}
