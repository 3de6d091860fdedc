//! User records as seen by the identity resolver.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use warden_core::{AccessResult, UserId};

use crate::Role;

/// A stored user, decoded from its storage row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,

    /// Stored password hash (bcrypt). Never the plaintext.
    #[serde(skip_serializing)]
    pub password: String,

    /// Per-user secret mixed into the session fingerprint; rotating it signs
    /// the user out everywhere.
    #[serde(skip_serializing)]
    pub token: String,

    pub roles: Vec<Role>,
}

/// Lookup of user records.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> AccessResult<Option<UserRecord>>;

    async fn find_by_name(&self, name: &str) -> AccessResult<Option<UserRecord>>;
}

#[async_trait]
impl<D> UserDirectory for std::sync::Arc<D>
where
    D: UserDirectory + ?Sized,
{
    async fn find_by_id(&self, id: &UserId) -> AccessResult<Option<UserRecord>> {
        (**self).find_by_id(id).await
    }

    async fn find_by_name(&self, name: &str) -> AccessResult<Option<UserRecord>> {
        (**self).find_by_name(name).await
    }
}
