//! Store administration: catalog upkeep and the order desk.
//!
//! Every handler checks its permission first; non-admin callers get 403
//! before any service runs.

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::json;

use storefront_auth::Permission;
use storefront_catalog::ProductDetails;
use storefront_core::{Money, OrderId, ProductId};
use storefront_orders::OrderStatus;

use crate::app::dto::{
    CreateProductRequest, RestockRequest, UpdateStatusRequest, order_to_json, product_to_json, report_to_json,
};
use crate::app::errors::{
    catalog_error_to_response, domain_error_to_response, fulfillment_error_to_response, json_error,
};
use crate::app::routes::{parse_id, read_body};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/products", post(create_product))
        .route("/products/:id/restock", post(restock))
        .route("/orders", get(list_orders))
        .route("/orders/report", get(orders_report))
        .route("/orders/:id/status", put(update_status))
}

async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Response {
    if let Err(resp) = authz::require(&principal, &Permission::MANAGE_CATALOG) {
        return resp;
    }
    let body = match read_body(payload) {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    let price = match Money::new(body.price) {
        Ok(price) => price,
        Err(e) => return domain_error_to_response(e),
    };
    let details = ProductDetails {
        name: body.name,
        description: body.description,
        category: body.category,
        price,
    };

    match services.catalog.create_product(details, body.stock).await {
        Ok(product) => (StatusCode::CREATED, Json(product_to_json(&product))).into_response(),
        Err(e) => catalog_error_to_response(e),
    }
}

async fn restock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    payload: Result<Json<RestockRequest>, JsonRejection>,
) -> Response {
    if let Err(resp) = authz::require(&principal, &Permission::MANAGE_CATALOG) {
        return resp;
    }
    let body = match read_body(payload) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let product_id: ProductId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.catalog.restock(product_id, body.quantity).await {
        Ok(stock) => Json(json!({ "product_id": product_id, "stock": stock })).into_response(),
        Err(e) => catalog_error_to_response(e),
    }
}

async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = authz::require(&principal, &Permission::MANAGE_ORDERS) {
        return resp;
    }

    match services.fulfillment.all_orders().await {
        Ok(orders) => Json(orders.iter().map(order_to_json).collect::<Vec<_>>()).into_response(),
        Err(e) => fulfillment_error_to_response(e),
    }
}

async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Response {
    if let Err(resp) = authz::require(&principal, &Permission::MANAGE_ORDERS) {
        return resp;
    }
    let body = match read_body(payload) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let order_id: OrderId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let status: OrderStatus = match body.status.parse() {
        Ok(status) => status,
        Err(e) => {
            return json_error(StatusCode::BAD_REQUEST, "invalid_status", e.to_string());
        }
    };

    match services.fulfillment.update_status(order_id, status).await {
        Ok(order) => Json(order_to_json(&order)).into_response(),
        Err(e) => fulfillment_error_to_response(e),
    }
}

async fn orders_report(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = authz::require(&principal, &Permission::MANAGE_ORDERS) {
        return resp;
    }

    match services.fulfillment.report().await {
        Ok(report) => Json(report_to_json(&report)).into_response(),
        Err(e) => fulfillment_error_to_response(e),
    }
}
