use serde::{Deserialize, Serialize};

use warden_auth::{Role, UserRecord};
use warden_core::UserId;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub name: String,
    pub password: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct SignedInResponse {
    pub id: UserId,
    pub name: String,
    pub roles: Vec<Role>,
}

impl From<&UserRecord> for SignedInResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            roles: user.roles.clone(),
        }
    }
}
