//! Postgres-backed user directory over the `users` table.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use warden_auth::{Role, UserDirectory, UserRecord};
use warden_core::{AccessResult, UserId, split_values};

use crate::source::postgres::map_sqlx_error;

#[derive(Debug, Clone)]
pub struct PostgresUserDirectory {
    pool: Arc<PgPool>,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    /// Ids that are not integers cannot name a row and resolve to `None`.
    #[instrument(skip(self, id), fields(user_id = %id), err)]
    async fn find_by_id(&self, id: &UserId) -> AccessResult<Option<UserRecord>> {
        let Ok(key) = id.as_str().parse::<i64>() else {
            return Ok(None);
        };

        let row = sqlx::query("SELECT id, name, password, token, roles FROM users WHERE id = $1")
            .bind(key)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_id", e))?;

        row.map(|row| UserRow::from_row(&row).map(UserRecord::from))
            .transpose()
            .map_err(|e| map_sqlx_error("find_user_by_id", e))
    }

    #[instrument(skip(self), err)]
    async fn find_by_name(&self, name: &str) -> AccessResult<Option<UserRecord>> {
        let row = sqlx::query("SELECT id, name, password, token, roles FROM users WHERE name = $1")
            .bind(name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_name", e))?;

        row.map(|row| UserRow::from_row(&row).map(UserRecord::from))
            .transpose()
            .map_err(|e| map_sqlx_error("find_user_by_name", e))
    }
}

#[derive(Debug)]
struct UserRow {
    id: i64,
    name: String,
    password: String,
    token: String,
    roles: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for UserRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            password: row.try_get("password")?,
            token: row.try_get("token")?,
            roles: row.try_get("roles")?,
        })
    }
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        UserRecord {
            id: UserId::from(row.id),
            name: row.name,
            password: row.password,
            token: row.token,
            roles: split_values(row.roles.as_deref()).into_iter().map(Role::from).collect(),
        }
    }
}
