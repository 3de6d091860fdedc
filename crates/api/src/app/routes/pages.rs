//! Demo pages guarded by the route table.

use axum::{Extension, Json, response::IntoResponse};
use serde_json::json;

use warden_auth::Identity;

pub async fn home() -> impl IntoResponse {
    Json(json!({ "page": "home" }))
}

pub async fn hello(Extension(identity): Extension<Identity>) -> impl IntoResponse {
    let name = if identity.is_authenticated() { identity.name() } else { "guest" };
    Json(json!({ "page": "hello", "message": format!("hello, {name}") }))
}

pub async fn admin_panel(Extension(identity): Extension<Identity>) -> impl IntoResponse {
    Json(json!({ "page": "admin-panel", "user": identity.name() }))
}
