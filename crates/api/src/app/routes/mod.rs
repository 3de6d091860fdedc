use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod pages;
pub mod system;

/// Router for every endpoint behind the session and access layers.
pub fn router() -> Router {
    Router::new()
        .route("/", get(pages::home))
        .route("/hello", get(pages::hello))
        .route("/admin-panel", get(pages::admin_panel))
        .route("/whoami", get(system::whoami))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
}
