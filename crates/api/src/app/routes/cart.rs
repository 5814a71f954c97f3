use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, rejection::JsonRejection},
    response::{IntoResponse, Response},
};

use storefront_core::ProductId;

use crate::app::dto::{AddCartItemRequest, UpdateCartItemRequest, cart_to_json};
use crate::app::errors::cart_error_to_response;
use crate::app::routes::{parse_id, read_body};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn view_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    match services.carts.view(principal.user_id()).await {
        Ok(cart) => Json(cart_to_json(&cart)).into_response(),
        Err(e) => cart_error_to_response(e),
    }
}

/// Adding a product already in the cart adds to its quantity.
pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<AddCartItemRequest>, JsonRejection>,
) -> Response {
    let body = match read_body(payload) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let product_id: ProductId = match parse_id(&body.product_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.carts.add(principal.user_id(), product_id, body.quantity).await {
        Ok(cart) => Json(cart_to_json(&cart)).into_response(),
        Err(e) => cart_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(product_id): Path<String>,
    payload: Result<Json<UpdateCartItemRequest>, JsonRejection>,
) -> Response {
    let body = match read_body(payload) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let product_id: ProductId = match parse_id(&product_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.carts.update(principal.user_id(), product_id, body.quantity).await {
        Ok(cart) => Json(cart_to_json(&cart)).into_response(),
        Err(e) => cart_error_to_response(e),
    }
}

pub async fn remove_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(product_id): Path<String>,
) -> Response {
    let product_id: ProductId = match parse_id(&product_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.carts.remove(principal.user_id(), product_id).await {
        Ok(cart) => Json(cart_to_json(&cart)).into_response(),
        Err(e) => cart_error_to_response(e),
    }
}
