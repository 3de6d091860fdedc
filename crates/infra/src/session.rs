//! Server-side session storage.
//!
//! The cookie carries only a [`SessionId`]; values live in a [`SessionStore`].

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use warden_auth::Session;
use warden_core::{AccessError, AccessResult, SessionId};

/// One session's key/value data plus the bookkeeping the cookie layer needs.
#[derive(Debug, Clone)]
pub struct SessionData {
    id: SessionId,
    values: HashMap<String, String>,
    fresh: bool,
    replaced: Option<SessionId>,
    dirty: bool,
}

impl SessionData {
    /// A new, empty session with a random id.
    pub fn new() -> Self {
        Self {
            id: SessionId::generate(),
            values: HashMap::new(),
            fresh: true,
            replaced: None,
            dirty: false,
        }
    }

    /// A session restored from storage.
    pub fn restore(id: SessionId, values: HashMap<String, String>) -> Self {
        Self {
            id,
            values,
            fresh: false,
            replaced: None,
            dirty: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn values(&self) -> &HashMap<String, String> {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Created during this request.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Changed by this request and must be written back.
    ///
    /// Unchanged sessions are only touched, never saved, so a request that
    /// merely read the session cannot overwrite a concurrent sign-out.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Id this session was rotated away from, if any.
    pub fn replaced(&self) -> Option<SessionId> {
        self.replaced
    }

    /// Move the data under a new id. Called on sign-in so that an id handed
    /// out before authentication never becomes an authenticated one.
    pub fn rotate(&mut self) {
        let previous = std::mem::replace(&mut self.id, SessionId::generate());
        self.dirty = true;
        if !self.fresh && self.replaced.is_none() {
            self.replaced = Some(previous);
        }
    }

    /// Whether the client must be sent the current id.
    pub fn needs_cookie(&self) -> bool {
        !self.is_empty() && (self.fresh || self.replaced.is_some())
    }
}

impl Default for SessionData {
    fn default() -> Self {
        Self::new()
    }
}

impl Session for SessionData {
    fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        if self.values.get(key) != Some(&value) {
            self.values.insert(key.to_string(), value);
            self.dirty = true;
        }
    }

    fn unset(&mut self, key: &str) -> Option<String> {
        let previous = self.values.remove(key);
        self.dirty |= previous.is_some();
        previous
    }
}

/// Persistence for [`SessionData`].
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, id: &SessionId) -> AccessResult<Option<SessionData>>;

    /// Persist `session`. Empty sessions are removed rather than stored, and a
    /// rotated session's previous id is dropped.
    async fn save(&self, session: &SessionData) -> AccessResult<()>;

    /// Refresh the idle timer of a stored session without writing its values.
    /// A session that is no longer stored stays absent.
    async fn touch(&self, id: &SessionId) -> AccessResult<()>;

    async fn remove(&self, id: &SessionId) -> AccessResult<()>;
}

#[async_trait]
impl<S> SessionStore for std::sync::Arc<S>
where
    S: SessionStore + ?Sized,
{
    async fn load(&self, id: &SessionId) -> AccessResult<Option<SessionData>> {
        (**self).load(id).await
    }

    async fn save(&self, session: &SessionData) -> AccessResult<()> {
        (**self).save(session).await
    }

    async fn touch(&self, id: &SessionId) -> AccessResult<()> {
        (**self).touch(id).await
    }

    async fn remove(&self, id: &SessionId) -> AccessResult<()> {
        (**self).remove(id).await
    }
}

#[derive(Debug, Clone)]
struct StoredSession {
    values: HashMap<String, String>,
    touched_at: DateTime<Utc>,
}

/// Process-local session store with idle expiry.
///
/// Sessions untouched for longer than the idle window are treated as absent
/// and purged on the next write.
#[derive(Debug)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, StoredSession>>,
    idle: Duration,
}

impl InMemorySessionStore {
    pub fn new(idle: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_live(&self, stored: &StoredSession, now: DateTime<Utc>) -> bool {
        now - stored.touched_at <= self.idle
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(Duration::minutes(120))
    }
}

fn poisoned() -> AccessError {
    AccessError::source("session store lock poisoned")
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, id: &SessionId) -> AccessResult<Option<SessionData>> {
        let sessions = self.sessions.read().map_err(|_| poisoned())?;
        let now = Utc::now();

        Ok(sessions
            .get(id)
            .filter(|stored| self.is_live(stored, now))
            .map(|stored| SessionData::restore(*id, stored.values.clone())))
    }

    async fn save(&self, session: &SessionData) -> AccessResult<()> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        let now = Utc::now();

        sessions.retain(|_, stored| now - stored.touched_at <= self.idle);

        if let Some(previous) = session.replaced() {
            sessions.remove(&previous);
        }

        if session.is_empty() {
            sessions.remove(&session.id());
        } else {
            sessions.insert(
                session.id(),
                StoredSession {
                    values: session.values().clone(),
                    touched_at: now,
                },
            );
        }

        Ok(())
    }

    async fn touch(&self, id: &SessionId) -> AccessResult<()> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        let now = Utc::now();

        if let Some(stored) = sessions.get_mut(id) {
            if now - stored.touched_at <= self.idle {
                stored.touched_at = now;
            }
        }
        Ok(())
    }

    async fn remove(&self, id: &SessionId) -> AccessResult<()> {
        self.sessions.write().map_err(|_| poisoned())?.remove(id);
        Ok(())
    }
}
