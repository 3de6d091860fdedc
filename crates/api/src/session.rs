//! Cookie-backed session layer.
//!
//! Installs a [`SharedSession`] in request extensions for the access
//! middleware and handlers, then writes it back after the handler returns
//! when the request changed it.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, Request, header},
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;
use tracing::{debug, error};

use warden_core::SessionId;
use warden_infra::{SessionData, SessionStore};

/// Request-scoped handle on the caller's session.
pub type SharedSession = Arc<Mutex<SessionData>>;

#[derive(Clone)]
pub struct SessionState {
    pub store: Arc<dyn SessionStore>,
    pub cookie_name: String,
}

impl SessionState {
    pub fn new(store: Arc<dyn SessionStore>, cookie_name: impl Into<String>) -> Self {
        Self {
            store,
            cookie_name: cookie_name.into(),
        }
    }
}

pub async fn session_middleware(
    State(state): State<SessionState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let session = load_session(&state, req.headers()).await;
    let shared: SharedSession = Arc::new(Mutex::new(session));
    req.extensions_mut().insert(shared.clone());

    let mut response = next.run(req).await;

    let session = shared.lock().await;
    let persisted = if session.is_dirty() {
        state.store.save(&session).await
    } else if session.is_fresh() {
        Ok(())
    } else {
        state.store.touch(&session.id()).await
    };
    if let Err(err) = persisted {
        error!(error = %err, "failed to persist session");
        return response;
    }

    if session.needs_cookie() {
        let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", state.cookie_name, session.id());
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(err) => error!(error = %err, "session cookie is not a valid header value"),
        }
    }

    response
}

async fn load_session(state: &SessionState, headers: &HeaderMap) -> SessionData {
    let Some(id) = cookie_value(headers, &state.cookie_name).and_then(|raw| raw.parse::<SessionId>().ok()) else {
        return SessionData::new();
    };

    match state.store.load(&id).await {
        Ok(Some(session)) => session,
        Ok(None) => {
            debug!(session_id = %id, "unknown or expired session; starting a new one");
            SessionData::new()
        }
        Err(err) => {
            error!(error = %err, "failed to load session; starting a new one");
            SessionData::new()
        }
    }
}

/// Value of cookie `name` from the `Cookie` request headers.
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
}
