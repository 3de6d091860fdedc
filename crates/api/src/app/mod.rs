//! HTTP application wiring (Axum router + access-control layers).
//!
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use warden_infra::{AppConfig, Backends, InMemorySessionStore};

use crate::context::AccessContext;
use crate::middleware;
use crate::session::{self, SessionState};

pub mod dto;
pub mod errors;
pub mod routes;

/// Build the HTTP router around an injected access context.
///
/// Guarded handlers are mounted under `ctx.base_path`; the access layer sits
/// outside that mount so it sees the full request path. `/health` bypasses
/// both the session layer and access control.
pub fn build_app(ctx: AccessContext, sessions: SessionState) -> Router {
    let pages = match ctx.base_path.as_str() {
        "" => routes::router(),
        base_path => Router::new().nest(base_path, routes::router()),
    };

    let guarded = pages
        .layer(Extension(ctx.clone()))
        .layer(axum::middleware::from_fn_with_state(ctx, middleware::access_middleware))
        .layer(axum::middleware::from_fn_with_state(sessions, session::session_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(guarded)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// Build the router from configuration (public entrypoint used by `main.rs`).
pub async fn build_app_from_config(config: &AppConfig) -> anyhow::Result<Router> {
    let backends = Backends::connect(config).await?;
    let ctx = AccessContext::from_config(config, backends)?;

    let settings = &config.access_control;
    let store = Arc::new(InMemorySessionStore::new(settings.session_idle()));
    let sessions = SessionState::new(store, settings.session_cookie.clone());

    Ok(build_app(ctx, sessions))
}
