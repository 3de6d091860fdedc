use serde::Serialize;

use warden_core::UserId;

use crate::Role;

/// The resolved caller of a request.
///
/// Built once per request by the identity resolver and never mutated
/// afterwards. The anonymous identity has no id, an empty name and no roles.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Identity {
    id: Option<UserId>,
    name: String,
    roles: Vec<Role>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(id: UserId, name: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
            roles,
        }
    }

    pub fn id(&self) -> Option<&UserId> {
        self.id.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Roles in the order they were stored for the user.
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// An identity counts as authenticated once it carries a user name.
    pub fn is_authenticated(&self) -> bool {
        !self.name.is_empty()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.as_str() == role)
    }
}
