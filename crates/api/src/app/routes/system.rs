use axum::{Extension, Json};
use serde_json::json;

use crate::context::PrincipalContext;

pub async fn health() -> &'static str {
    "ok"
}

pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> Json<serde_json::Value> {
    Json(json!({
        "user_id": principal.user_id(),
        "name": principal.display_name(),
        "roles": principal.roles().iter().map(|r| r.as_str()).collect::<Vec<_>>(),
        "is_admin": principal.is_admin(),
    }))
}
