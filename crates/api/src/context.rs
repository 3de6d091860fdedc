use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::Response;

use warden_auth::{AccessControl, IdentityResolver, PermissionSource, SessionHasher, UserDirectory};
use warden_core::ConfigurationError;
use warden_infra::{AppConfig, Backends};

use crate::app::errors::json_error;
use crate::routes::{RouteResolver, RouteTable, normalize_base_path};

/// Builds the response for a denied request.
pub type DenialResponder = Arc<dyn Fn() -> Response + Send + Sync>;

/// Optional overrides for the 401 and 403 responses.
#[derive(Clone, Default)]
pub struct DenialResponders {
    unauthorized: Option<DenialResponder>,
    forbidden: Option<DenialResponder>,
}

impl DenialResponders {
    pub fn on_unauthorized(mut self, responder: impl Fn() -> Response + Send + Sync + 'static) -> Self {
        self.unauthorized = Some(Arc::new(responder));
        self
    }

    pub fn on_forbidden(mut self, responder: impl Fn() -> Response + Send + Sync + 'static) -> Self {
        self.forbidden = Some(Arc::new(responder));
        self
    }

    pub fn unauthorized(&self) -> Response {
        match &self.unauthorized {
            Some(responder) => responder(),
            None => json_error(StatusCode::UNAUTHORIZED, "unauthorized", "request rejected"),
        }
    }

    pub fn forbidden(&self) -> Response {
        match &self.forbidden {
            Some(responder) => responder(),
            None => json_error(StatusCode::FORBIDDEN, "forbidden", "access denied"),
        }
    }
}

/// Everything the access middleware needs, injected as router state.
#[derive(Clone)]
pub struct AccessContext {
    pub access: AccessControl,
    pub resolver: IdentityResolver,
    pub routes: Arc<dyn RouteResolver>,
    /// Prefix the guarded handlers are mounted under; `""` for the root.
    pub base_path: String,
    pub responders: DenialResponders,
    pub decision_timeout: Duration,
    pub trust_proxy_headers: bool,
}

impl AccessContext {
    pub const DEFAULT_DECISION_TIMEOUT: Duration = Duration::from_secs(2);

    pub fn new(
        source: Arc<dyn PermissionSource>,
        users: Arc<dyn UserDirectory>,
        routes: Arc<dyn RouteResolver>,
        hasher: SessionHasher,
    ) -> Self {
        Self {
            access: AccessControl::new(source),
            resolver: IdentityResolver::new(users, hasher),
            routes,
            base_path: String::new(),
            responders: DenialResponders::default(),
            decision_timeout: Self::DEFAULT_DECISION_TIMEOUT,
            trust_proxy_headers: false,
        }
    }

    pub fn from_config(config: &AppConfig, backends: Backends) -> Result<Self, ConfigurationError> {
        let settings = &config.access_control;
        let routes = RouteTable::from_config(&config.server.base_path, &config.routes);

        Ok(Self::new(backends.source, backends.users, Arc::new(routes), settings.hasher()?)
            .with_base_path(&config.server.base_path)
            .with_decision_timeout(settings.decision_timeout())
            .with_trust_proxy_headers(settings.trust_proxy_headers))
    }

    pub fn with_responders(mut self, responders: DenialResponders) -> Self {
        self.responders = responders;
        self
    }

    /// Mount the guarded handlers under `base_path`. It must be the same base
    /// the route resolver prefixes its paths with.
    pub fn with_base_path(mut self, base_path: &str) -> Self {
        self.base_path = normalize_base_path(base_path);
        self
    }

    pub fn with_decision_timeout(mut self, timeout: Duration) -> Self {
        self.decision_timeout = timeout;
        self
    }

    pub fn with_trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;

    use super::*;

    #[test]
    fn default_responders_use_bare_statuses() {
        let responders = DenialResponders::default();
        assert_eq!(responders.unauthorized().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(responders.forbidden().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn overrides_replace_only_their_own_response() {
        let responders = DenialResponders::default()
            .on_unauthorized(|| StatusCode::IM_A_TEAPOT.into_response());
        assert_eq!(responders.unauthorized().status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(responders.forbidden().status(), StatusCode::FORBIDDEN);
    }
}
