use axum::{Extension, Json, http::StatusCode, response::IntoResponse};

use warden_auth::Identity;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(identity): Extension<Identity>) -> impl IntoResponse {
    Json(serde_json::json!({
        "authenticated": identity.is_authenticated(),
        "id": identity.id().map(|id| id.to_string()),
        "name": identity.name(),
        "roles": identity.roles().iter().map(|r| r.as_str()).collect::<Vec<_>>(),
    }))
}
