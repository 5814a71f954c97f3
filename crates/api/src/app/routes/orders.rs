use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::Path,
    response::{IntoResponse, Response},
};

use storefront_core::OrderId;

use crate::app::dto::order_to_json;
use crate::app::errors::fulfillment_error_to_response;
use crate::app::routes::parse_id;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// Caller's orders, newest first.
pub async fn my_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    match services.fulfillment.orders_of(principal.user_id()).await {
        Ok(orders) => Json(orders.iter().map(order_to_json).collect::<Vec<_>>()).into_response(),
        Err(e) => fulfillment_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let order_id: OrderId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services
        .fulfillment
        .order_for(order_id, principal.user_id(), principal.is_admin())
        .await
    {
        Ok(order) => Json(order_to_json(&order)).into_response(),
        Err(e) => fulfillment_error_to_response(e),
    }
}
