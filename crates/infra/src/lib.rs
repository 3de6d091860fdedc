//! Infrastructure layer: configuration, Postgres adapters, session storage.

pub mod config;
pub mod pool;
pub mod session;
pub mod source;
pub mod users;

use std::sync::Arc;

use warden_auth::{PermissionSource, UserDirectory};
use warden_core::AccessResult;

pub use config::{AccessControlConfig, AppConfig, RouteConfig, SourceConfig};
pub use pool::Pools;
pub use session::{InMemorySessionStore, SessionData, SessionStore};
pub use source::DbSource;
pub use users::{InMemoryUserDirectory, PostgresUserDirectory};

/// Backends named by the configuration.
#[derive(Clone)]
pub struct Backends {
    pub source: Arc<dyn PermissionSource>,
    pub users: Arc<dyn UserDirectory>,
}

impl Backends {
    /// Build the permission source and user directory. Drivers that share a
    /// database connection share its pool.
    pub async fn connect(config: &AppConfig) -> AccessResult<Self> {
        let mut pools = Pools::default();
        let source = source::connect(config, &mut pools).await?;
        let users = users::connect(config, &mut pools).await?;
        Ok(Self { source, users })
    }
}
