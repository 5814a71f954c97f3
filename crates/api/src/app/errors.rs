use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tracing::error;

use storefront_core::{DomainError, ProductId};
use storefront_infra::{CartServiceError, CatalogServiceError, CheckoutError, FulfillmentError, ReviewGateError};
use storefront_reviews::ReviewRejection;

pub fn checkout_error_to_response(err: CheckoutError) -> Response {
    match err {
        CheckoutError::CartEmpty => json_error(StatusCode::BAD_REQUEST, "cart_empty", "cart is empty"),
        CheckoutError::ProductNotFound(product_id) => json_error_with(
            StatusCode::NOT_FOUND,
            "product_not_found",
            format!("product {product_id} not found"),
            json!({ "product_id": product_id }),
        ),
        CheckoutError::InvalidQuantity { product_id, quantity } => json_error_with(
            StatusCode::BAD_REQUEST,
            "invalid_quantity",
            format!("invalid quantity {quantity} for product {product_id}"),
            json!({ "product_id": product_id, "quantity": quantity }),
        ),
        CheckoutError::InsufficientStock(shortfall) => json_error_with(
            StatusCode::CONFLICT,
            "insufficient_stock",
            format!("insufficient stock for {}", shortfall.product_name),
            json!({
                "product_id": shortfall.product_id,
                "product_name": shortfall.product_name,
                "available": shortfall.available,
                "requested": shortfall.requested,
            }),
        ),
        CheckoutError::Internal(msg) => internal_error("checkout", msg),
    }
}

pub fn review_error_to_response(err: ReviewGateError) -> Response {
    match err {
        ReviewGateError::ProductNotFound(product_id) => product_not_found(product_id),
        ReviewGateError::Rejected(rejection) => match rejection {
            ReviewRejection::InvalidRating(invalid) => json_error_with(
                StatusCode::BAD_REQUEST,
                "invalid_rating",
                invalid.to_string(),
                json!({ "rating": invalid.0 }),
            ),
            ReviewRejection::NotDelivered => {
                json_error(StatusCode::FORBIDDEN, "not_delivered", rejection.to_string())
            }
            ReviewRejection::AlreadyReviewed => {
                json_error(StatusCode::CONFLICT, "already_reviewed", rejection.to_string())
            }
        },
        ReviewGateError::Internal(e) => internal_error("review", e),
    }
}

pub fn fulfillment_error_to_response(err: FulfillmentError) -> Response {
    match err {
        FulfillmentError::OrderNotFound(order_id) => json_error_with(
            StatusCode::NOT_FOUND,
            "order_not_found",
            format!("order {order_id} not found"),
            json!({ "order_id": order_id }),
        ),
        FulfillmentError::Forbidden(_) => {
            json_error(StatusCode::FORBIDDEN, "forbidden", "not allowed to view this order")
        }
        FulfillmentError::Conflict(msg) => json_error(StatusCode::CONFLICT, "status_conflict", msg),
        FulfillmentError::InvalidTransition(msg) => {
            json_error(StatusCode::CONFLICT, "invalid_transition", msg)
        }
        FulfillmentError::Internal(e) => internal_error("orders", e),
    }
}

pub fn catalog_error_to_response(err: CatalogServiceError) -> Response {
    match err {
        CatalogServiceError::NotFound(product_id) => product_not_found(product_id),
        CatalogServiceError::Invalid(e) => domain_error_to_response(e),
        CatalogServiceError::Internal(e) => internal_error("catalog", e),
    }
}

pub fn cart_error_to_response(err: CartServiceError) -> Response {
    match err {
        CartServiceError::ProductNotFound(product_id) => product_not_found(product_id),
        CartServiceError::LineNotFound(product_id) => json_error_with(
            StatusCode::NOT_FOUND,
            "cart_item_not_found",
            format!("product {product_id} is not in the cart"),
            json!({ "product_id": product_id }),
        ),
        CartServiceError::Invalid(e) => domain_error_to_response(e),
        CartServiceError::Internal(e) => internal_error("cart", e),
    }
}

/// Body rejections keep the JSON error shape. Bad syntax or a wrong field
/// type is a 400; other rejections (e.g. missing content type) keep their status.
pub fn json_rejection_to_response(rejection: JsonRejection) -> Response {
    let status = match &rejection {
        JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => StatusCode::BAD_REQUEST,
        other => other.status(),
    };
    json_error(status, "invalid_body", rejection.body_text())
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "invariant_violation", msg)
        }
        err @ DomainError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

fn product_not_found(product_id: ProductId) -> Response {
    json_error_with(
        StatusCode::NOT_FOUND,
        "product_not_found",
        format!("product {product_id} not found"),
        json!({ "product_id": product_id }),
    )
}

/// Backend detail goes to the log, never to the client.
fn internal_error(area: &'static str, err: impl std::fmt::Display) -> Response {
    error!(area, error = %err, "request failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal server error")
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Like [`json_error`], with the fields of `details` merged into the body.
pub fn json_error_with(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    details: Value,
) -> Response {
    let mut body = json!({
        "error": code,
        "message": message.into(),
    });
    if let (Some(body), Value::Object(details)) = (body.as_object_mut(), details) {
        body.extend(details);
    }
    (status, axum::Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_catalog::StockShortfall;
    use storefront_reviews::InvalidRating;

    async fn body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn shortfall_carries_available_and_requested() {
        let product_id = ProductId::new();
        let response = checkout_error_to_response(CheckoutError::InsufficientStock(StockShortfall {
            product_id,
            product_name: "Lamp".to_string(),
            available: 1,
            requested: 3,
        }));
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = body(response).await;
        assert_eq!(body["error"], "insufficient_stock");
        assert_eq!(body["product_id"], product_id.to_string());
        assert_eq!(body["available"], 1);
        assert_eq!(body["requested"], 3);
    }

    #[tokio::test]
    async fn review_rejections_map_to_distinct_statuses() {
        let cases = [
            (ReviewRejection::InvalidRating(InvalidRating(9)), StatusCode::BAD_REQUEST),
            (ReviewRejection::NotDelivered, StatusCode::FORBIDDEN),
            (ReviewRejection::AlreadyReviewed, StatusCode::CONFLICT),
        ];
        for (rejection, status) in cases {
            assert_eq!(review_error_to_response(rejection.into()).status(), status);
        }
    }

    #[tokio::test]
    async fn internal_errors_hide_backend_detail() {
        let response = checkout_error_to_response(CheckoutError::Internal("pg: relation missing".to_string()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body(response).await;
        assert_eq!(body["error"], "internal_error");
        assert!(!body["message"].as_str().unwrap().contains("pg"));
    }
}
