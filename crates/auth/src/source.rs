//! Permission sources: where filters, the permission registry and role
//! assignments come from.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use warden_core::AccessResult;

use crate::{Assignments, FilterRules, Permission, Role};

/// Read-only view over access-control data.
///
/// Implementations are read-through: every call reads the backing store, and
/// two calls without intervening writes return equal values.
#[async_trait]
pub trait PermissionSource: Send + Sync {
    /// Short driver name for logs ("file", "db").
    fn driver(&self) -> &'static str;

    /// Blocklist filters keyed by kind, in stored order.
    async fn filters(&self) -> AccessResult<FilterRules>;

    /// The permission registry: permissions that require authentication.
    async fn permissions(&self) -> AccessResult<Vec<Permission>>;

    /// Role → permission assignments.
    async fn assignments(&self) -> AccessResult<Assignments>;

    /// The configured role universe (informational; not used for decisions).
    async fn roles(&self) -> AccessResult<Vec<Role>>;
}

#[async_trait]
impl<S> PermissionSource for Arc<S>
where
    S: PermissionSource + ?Sized,
{
    fn driver(&self) -> &'static str {
        (**self).driver()
    }

    async fn filters(&self) -> AccessResult<FilterRules> {
        (**self).filters().await
    }

    async fn permissions(&self) -> AccessResult<Vec<Permission>> {
        (**self).permissions().await
    }

    async fn assignments(&self) -> AccessResult<Assignments> {
        (**self).assignments().await
    }

    async fn roles(&self) -> AccessResult<Vec<Role>> {
        (**self).roles().await
    }
}

/// Access-control section of a static configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessControlDocument {
    /// Permissions (route names) that require authentication.
    #[serde(default)]
    pub permissions: Vec<Permission>,

    /// Available roles.
    #[serde(default)]
    pub roles: Vec<Role>,

    /// Role → permissions.
    #[serde(default)]
    pub assignments: Assignments,

    /// Filter kind → blocked patterns.
    #[serde(default)]
    pub filters: FilterRules,
}

/// Permission source backed by static configuration.
#[derive(Debug, Clone, Default)]
pub struct FileSource {
    document: AccessControlDocument,
}

impl FileSource {
    pub fn new(document: AccessControlDocument) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &AccessControlDocument {
        &self.document
    }
}

#[async_trait]
impl PermissionSource for FileSource {
    fn driver(&self) -> &'static str {
        "file"
    }

    async fn filters(&self) -> AccessResult<FilterRules> {
        Ok(self.document.filters.clone())
    }

    async fn permissions(&self) -> AccessResult<Vec<Permission>> {
        Ok(self.document.permissions.clone())
    }

    async fn assignments(&self) -> AccessResult<Assignments> {
        Ok(self.document.assignments.clone())
    }

    async fn roles(&self) -> AccessResult<Vec<Role>> {
        Ok(self.document.roles.clone())
    }
}
