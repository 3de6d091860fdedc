//! Resolve the caller's identity from the session.

use std::sync::Arc;

use tracing::{debug, info, warn};

use warden_core::{AccessError, AccessResult, UserId};

use crate::{Identity, SESSION_USER_HASH, SESSION_USER_ID, Session, SessionHasher, UserDirectory, UserRecord};

/// Well-formed cost-10 bcrypt hash compared when the requested user does not
/// exist. The outcome is discarded.
pub(crate) const UNKNOWN_USER_HASH: &str = "$2y$10$.vGA1O9wmRjrwAVXD98HNOgsNpDczlqm3Jq7KnEd1rVAGv3Fykk1a";

async fn check_password(plaintext: &str, stored: &str) -> AccessResult<bool> {
    let (plaintext, stored) = (plaintext.to_string(), stored.to_string());
    tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &stored).unwrap_or(false))
        .await
        .map_err(|e| AccessError::source(format!("password check task failed: {e}")))
}

/// Turns a session into an [`Identity`].
///
/// Resolution never fails: any missing, stale or unverifiable session state
/// degrades to the anonymous identity. The only side effect is clearing the
/// session binding when its hash no longer verifies.
#[derive(Clone)]
pub struct IdentityResolver {
    users: Arc<dyn UserDirectory>,
    hasher: SessionHasher,
}

impl IdentityResolver {
    pub fn new(users: Arc<dyn UserDirectory>, hasher: SessionHasher) -> Self {
        Self { users, hasher }
    }

    pub fn hasher(&self) -> SessionHasher {
        self.hasher
    }

    /// Authenticate the current caller.
    pub async fn authenticate(
        &self,
        session: &mut (dyn Session + Send),
        user_agent: &str,
    ) -> Identity {
        let Some(raw_id) = session.get(SESSION_USER_ID).filter(|id| !id.is_empty()) else {
            return Identity::anonymous();
        };
        let id = UserId::new(raw_id);

        let user = match self.users.find_by_id(&id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!(user_id = %id, "session refers to an unknown user");
                return Identity::anonymous();
            }
            Err(err) => {
                warn!(user_id = %id, error = %err, "user lookup failed; treating caller as anonymous");
                return Identity::anonymous();
            }
        };

        let stored_hash = session.get(SESSION_USER_HASH).unwrap_or_default();
        if !self.verify_binding(&user, user_agent, stored_hash).await {
            warn!(user_id = %id, "session hash mismatch; clearing session binding");
            session.unset(SESSION_USER_ID);
            session.unset(SESSION_USER_HASH);
            return Identity::anonymous();
        }

        Identity::authenticated(id, user.name, user.roles)
    }

    /// Bind `user` to the session for subsequent requests from `user_agent`.
    pub async fn sign_in(
        &self,
        session: &mut (dyn Session + Send),
        user: &UserRecord,
        user_agent: &str,
    ) -> AccessResult<()> {
        let hasher = self.hasher;
        let (password, token, agent) = (user.password.clone(), user.token.clone(), user_agent.to_string());
        let session_hash = tokio::task::spawn_blocking(move || hasher.issue(&password, &token, &agent))
            .await
            .map_err(|e| AccessError::source(format!("session hash task failed: {e}")))?
            .map_err(|e| AccessError::source(format!("failed to hash session: {e}")))?;

        session.set(SESSION_USER_ID, user.id.to_string());
        session.set(SESSION_USER_HASH, session_hash);

        info!(user_id = %user.id, user = %user.name, "user signed in");
        Ok(())
    }

    /// Remove the session binding.
    pub fn sign_out(&self, session: &mut (dyn Session + Send)) {
        let user_id = session.unset(SESSION_USER_ID);
        session.unset(SESSION_USER_HASH);

        if let Some(user_id) = user_id {
            info!(user_id = %user_id, "user signed out");
        }
    }

    /// Check a plaintext password against the stored password hash.
    ///
    /// Returns the user on success and `None` for an unknown name or a wrong
    /// password. Unknown names are still checked against a placeholder hash so
    /// both outcomes cost one bcrypt verification.
    pub async fn verify_credentials(&self, name: &str, password: &str) -> AccessResult<Option<UserRecord>> {
        let Some(user) = self.users.find_by_name(name).await? else {
            check_password(password, UNKNOWN_USER_HASH).await?;
            debug!(user = name, "sign-in attempt for unknown user");
            return Ok(None);
        };

        if !check_password(password, &user.password).await? {
            debug!(user = name, "sign-in attempt with wrong password");
            return Ok(None);
        }

        Ok(Some(user))
    }

    async fn verify_binding(&self, user: &UserRecord, user_agent: &str, stored_hash: String) -> bool {
        let hasher = self.hasher;
        let (password, token, agent) = (user.password.clone(), user.token.clone(), user_agent.to_string());

        match tokio::task::spawn_blocking(move || hasher.verify(&password, &token, &agent, &stored_hash)).await {
            Ok(valid) => valid,
            Err(err) => {
                warn!(error = %err, "session hash verification task failed");
                false
            }
        }
    }
}
