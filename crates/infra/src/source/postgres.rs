//! Postgres-backed permission source.
//!
//! Lists are stored as `|`-separated text columns:
//!
//! | table         | columns                          |
//! |---------------|----------------------------------|
//! | `filters`     | `type`, `list` (nullable)        |
//! | `permissions` | `name`                           |
//! | `roles`       | `name`                           |
//! | `assignments` | `role`, `permissions` (nullable) |
//!
//! Every call is read-through; nothing is cached between requests.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use warden_auth::{Assignments, FilterRules, Permission, PermissionSource, Role};
use warden_core::{AccessError, AccessResult, split_values};

#[derive(Debug, Clone)]
pub struct DbSource {
    pool: Arc<PgPool>,
}

impl DbSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    async fn names(&self, operation: &str, sql: &str) -> AccessResult<Vec<String>> {
        let rows = sqlx::query(sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("name"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error(operation, e))
    }
}

#[async_trait]
impl PermissionSource for DbSource {
    fn driver(&self) -> &'static str {
        "db"
    }

    #[instrument(skip(self), err)]
    async fn filters(&self) -> AccessResult<FilterRules> {
        let rows = sqlx::query(r#"SELECT "type", list FROM filters ORDER BY id"#)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_filters", e))?;

        let rows = rows
            .iter()
            .map(FilterRow::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("load_filters", e))?;

        Ok(filters_from_rows(rows))
    }

    #[instrument(skip(self), err)]
    async fn permissions(&self) -> AccessResult<Vec<Permission>> {
        let names = self
            .names("load_permissions", "SELECT name FROM permissions ORDER BY id")
            .await?;
        Ok(names.into_iter().map(Permission::from).collect())
    }

    #[instrument(skip(self), err)]
    async fn assignments(&self) -> AccessResult<Assignments> {
        let rows = sqlx::query("SELECT role, permissions FROM assignments ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_assignments", e))?;

        let rows = rows
            .iter()
            .map(AssignmentRow::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("load_assignments", e))?;

        Ok(assignments_from_rows(rows))
    }

    #[instrument(skip(self), err)]
    async fn roles(&self) -> AccessResult<Vec<Role>> {
        let names = self.names("load_roles", "SELECT name FROM roles ORDER BY id").await?;
        Ok(names.into_iter().map(Role::from).collect())
    }
}

/// Later rows for the same filter type replace earlier ones.
fn filters_from_rows(rows: Vec<FilterRow>) -> FilterRules {
    let mut rules = FilterRules::new();
    for row in rows {
        rules.insert(row.kind, split_values(row.list.as_deref()));
    }
    rules
}

/// Rows for the same role accumulate.
fn assignments_from_rows(rows: Vec<AssignmentRow>) -> Assignments {
    let mut assignments = Assignments::new();
    for row in rows {
        assignments
            .entry(Role::from(row.role))
            .or_default()
            .extend(split_values(row.permissions.as_deref()).into_iter().map(Permission::from));
    }
    assignments
}

pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> AccessError {
    match err {
        sqlx::Error::Database(db_err) => {
            AccessError::source(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => AccessError::source(format!("connection pool closed in {}", operation)),
        sqlx::Error::PoolTimedOut => {
            AccessError::source(format!("timed out waiting for a connection in {}", operation))
        }
        _ => AccessError::source(format!("sqlx error in {}: {}", operation, err)),
    }
}

// SQLx row types

#[derive(Debug)]
struct FilterRow {
    kind: String,
    list: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for FilterRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(FilterRow {
            kind: row.try_get("type")?,
            list: row.try_get("list")?,
        })
    }
}

#[derive(Debug)]
struct AssignmentRow {
    role: String,
    permissions: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for AssignmentRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(AssignmentRow {
            role: row.try_get("role")?,
            permissions: row.try_get("permissions")?,
        })
    }
}
