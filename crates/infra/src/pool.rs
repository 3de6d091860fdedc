//! Named Postgres connection pools.

use std::collections::HashMap;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use warden_core::{AccessError, AccessResult};

use crate::config::AppConfig;

/// Pools opened so far, keyed by connection name.
///
/// Drivers pointing at the same connection share one pool.
#[derive(Debug, Default)]
pub struct Pools {
    open: HashMap<String, PgPool>,
}

impl Pools {
    pub async fn get(&mut self, config: &AppConfig, name: &str) -> AccessResult<PgPool> {
        if let Some(pool) = self.open.get(name) {
            return Ok(pool.clone());
        }

        let url = config.database_url(name)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.access_control.max_connections)
            .connect(url)
            .await
            .map_err(|e| AccessError::source(format!("failed to connect to '{name}': {e}")))?;

        info!(connection = name, "connected to Postgres");
        self.open.insert(name.to_string(), pool.clone());
        Ok(pool)
    }
}
