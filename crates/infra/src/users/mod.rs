//! User directory drivers.

pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use warden_auth::{UserDirectory, UserRecord};
use warden_core::{AccessResult, UserId};

use crate::config::{AppConfig, SourceConfig};
use crate::pool::Pools;

pub use postgres::PostgresUserDirectory;

/// Build the user directory named by `access_control.users`.
pub async fn connect(config: &AppConfig, pools: &mut Pools) -> AccessResult<Arc<dyn UserDirectory>> {
    let users: Arc<dyn UserDirectory> = match &config.access_control.users {
        SourceConfig::File { location } => {
            let records: Vec<UserRecord> = config.section(location)?;
            Arc::new(InMemoryUserDirectory::new(records))
        }
        SourceConfig::Db { location } => Arc::new(PostgresUserDirectory::new(pools.get(config, location).await?)),
    };

    tracing::info!(driver = config.access_control.users.driver(), "user directory ready");
    Ok(users)
}

/// Fixed list of users, loaded from configuration or built in tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Vec<UserRecord>,
}

impl InMemoryUserDirectory {
    pub fn new(users: Vec<UserRecord>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_id(&self, id: &UserId) -> AccessResult<Option<UserRecord>> {
        Ok(self.users.iter().find(|user| &user.id == id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> AccessResult<Option<UserRecord>> {
        Ok(self.users.iter().find(|user| user.name == name).cloned())
    }
}
