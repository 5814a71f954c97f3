//! API-side authorization guard.
//!
//! Admin endpoints check a permission here, before any service is called.

use axum::http::StatusCode;
use axum::response::Response;

use storefront_auth::{Permission, authorize};

use crate::app::errors;
use crate::context::PrincipalContext;

/// `Err` carries a ready 403 response.
pub fn require(principal: &PrincipalContext, permission: &Permission) -> Result<(), Response> {
    authorize(principal.principal(), permission)
        .map_err(|e| errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()))
}
