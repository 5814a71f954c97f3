use std::sync::Arc;

use axum::{
    Extension, Json,
    body::Bytes,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::app::dto::{CheckoutRequest, order_to_json};
use crate::app::errors::{checkout_error_to_response, json_error};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// Place an order from the caller's cart.
///
/// The body is optional: an empty body checks out with blank shipping details.
pub async fn checkout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Bytes,
) -> Response {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        CheckoutRequest::default()
    } else {
        match serde_json::from_slice::<CheckoutRequest>(&body) {
            Ok(request) => request,
            Err(e) => return json_error(StatusCode::BAD_REQUEST, "invalid_body", e.to_string()),
        }
    };

    match services
        .checkout
        .checkout(principal.user_id(), request.shipping_details.unwrap_or_default())
        .await
    {
        Ok(order) => (StatusCode::CREATED, Json(order_to_json(&order))).into_response(),
        Err(e) => checkout_error_to_response(e),
    }
}
