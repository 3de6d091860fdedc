use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use warden_core::AccessError;

pub fn access_error_to_response(err: &AccessError) -> axum::response::Response {
    match err {
        AccessError::Configuration(e) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "configuration_error",
            e.to_string(),
        ),
        AccessError::Source(_) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "source_error",
            "access-control data is unavailable",
        ),
        AccessError::Timeout => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "decision_timeout",
            "access decision timed out",
        ),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
