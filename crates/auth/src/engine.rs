//! The access-control engine: filter → authentication requirement →
//! authorization, read through a [`PermissionSource`].

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use warden_core::AccessResult;

use crate::{Identity, PermissionSource, Role, authorize, filter};

/// Client attributes probed by the request filters.
///
/// Empty strings mean the attribute could not be observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: String,
    pub user_agent: String,
}

impl ClientInfo {
    pub fn new(ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            user_agent: user_agent.into(),
        }
    }
}

/// Terminal state of an access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    /// Hand the request to the next handler.
    Allow,
    /// A request filter blocked the client (401).
    Unauthorized,
    /// Authentication was required and the identity lacks it or the permission (403).
    Forbidden,
}

/// Authorization engine over a permission source.
#[derive(Clone)]
pub struct AccessControl {
    source: Arc<dyn PermissionSource>,
}

impl AccessControl {
    pub fn new(source: Arc<dyn PermissionSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn PermissionSource> {
        &self.source
    }

    /// Run the request filters (true = allow).
    pub async fn filter(&self, client: &ClientInfo) -> AccessResult<bool> {
        let filters = self.source.filters().await?;
        if filters.is_empty() {
            return Ok(true);
        }

        Ok(filter::evaluate(&filters, &client.ip, &client.user_agent)?)
    }

    /// Whether `permission` requires an authenticated caller.
    pub async fn is_authentication_required(&self, permission: &str) -> AccessResult<bool> {
        if permission.is_empty() {
            return Ok(false);
        }

        let registry = self.source.permissions().await?;
        if registry.is_empty() {
            debug!(driver = self.source.driver(), "permission registry is empty; nothing requires authentication");
        }

        Ok(authorize::is_authentication_required(&registry, permission))
    }

    /// Whether any of `roles` grants `permission`.
    pub async fn authorize(&self, roles: &[Role], permission: &str) -> AccessResult<bool> {
        if permission.is_empty() || roles.is_empty() {
            return Ok(false);
        }

        let assignments = self.source.assignments().await?;
        let granted = authorize::authorize(&assignments, roles, permission);

        if granted {
            let granting: Vec<&str> = authorize::granting_roles(&assignments, roles, permission)
                .into_iter()
                .map(Role::as_str)
                .collect();
            debug!(permission, roles = ?granting, "permission granted");
        }

        Ok(granted)
    }

    /// Decide a request for `permission` by `identity` from `client`.
    ///
    /// Filters gate every request before the route is even considered; routes
    /// that do not require authentication are allowed regardless of identity.
    pub async fn decide(
        &self,
        identity: &Identity,
        client: &ClientInfo,
        permission: &str,
    ) -> AccessResult<AccessDecision> {
        if !self.filter(client).await? {
            debug!(ip = %client.ip, "request rejected by filters");
            return Ok(AccessDecision::Unauthorized);
        }

        if !self.is_authentication_required(permission).await? {
            return Ok(AccessDecision::Allow);
        }

        if !identity.is_authenticated() {
            debug!(permission, "permission requires authentication; caller is anonymous");
            return Ok(AccessDecision::Forbidden);
        }

        if !self.authorize(identity.roles(), permission).await? {
            debug!(permission, user = identity.name(), "no role grants the permission");
            return Ok(AccessDecision::Forbidden);
        }

        Ok(AccessDecision::Allow)
    }
}
