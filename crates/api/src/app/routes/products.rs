use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use storefront_core::ProductId;

use crate::app::dto::{SubmitReviewRequest, eligibility_to_json, product_to_json, review_to_json};
use crate::app::errors::{catalog_error_to_response, json_error_with, review_error_to_response};
use crate::app::routes::{parse_id, read_body};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn list_products(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.catalog.list().await {
        Ok(products) => Json(products.iter().map(product_to_json).collect::<Vec<_>>()).into_response(),
        Err(e) => catalog_error_to_response(e),
    }
}

pub async fn get_product(Extension(services): Extension<Arc<AppServices>>, Path(id): Path<String>) -> Response {
    let product_id: ProductId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.catalog.get(product_id).await {
        Ok(product) => Json(product_to_json(&product)).into_response(),
        Err(e) => catalog_error_to_response(e),
    }
}

pub async fn list_reviews(Extension(services): Extension<Arc<AppServices>>, Path(id): Path<String>) -> Response {
    let product_id: ProductId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.catalog.reviews(product_id).await {
        Ok(reviews) => Json(reviews.iter().map(review_to_json).collect::<Vec<_>>()).into_response(),
        Err(e) => catalog_error_to_response(e),
    }
}

pub async fn can_review(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let product_id: ProductId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.reviews.can_review(principal.user_id(), product_id).await {
        Ok(eligibility) => Json(eligibility_to_json(eligibility)).into_response(),
        Err(e) => review_error_to_response(e),
    }
}

pub async fn submit_review(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    payload: Result<Json<SubmitReviewRequest>, JsonRejection>,
) -> Response {
    let body = match read_body(payload) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let product_id: ProductId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Some(rating) = body.integer_rating() else {
        return json_error_with(
            StatusCode::BAD_REQUEST,
            "invalid_rating",
            "rating must be an integer between 1 and 5",
            json!({ "rating": body.rating }),
        );
    };

    match services
        .reviews
        .submit_review(
            principal.user_id(),
            principal.display_name(),
            product_id,
            rating,
            body.comment,
        )
        .await
    {
        Ok(review) => (StatusCode::CREATED, Json(review_to_json(&review))).into_response(),
        Err(e) => review_error_to_response(e),
    }
}
