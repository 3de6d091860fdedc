//! Permission source drivers.
//!
//! - `file`: a section of the application configuration
//! - `db`: the `filters`, `permissions`, `roles` and `assignments` tables

pub mod postgres;

use std::sync::Arc;

use warden_auth::{AccessControlDocument, FileSource, PermissionSource};
use warden_core::AccessResult;

use crate::config::{AppConfig, SourceConfig};
use crate::pool::Pools;

pub use postgres::DbSource;

/// Build the permission source named by `access_control.source`.
pub async fn connect(config: &AppConfig, pools: &mut Pools) -> AccessResult<Arc<dyn PermissionSource>> {
    let source: Arc<dyn PermissionSource> = match &config.access_control.source {
        SourceConfig::File { location } => {
            let document: AccessControlDocument = config.section(location)?;
            Arc::new(FileSource::new(document))
        }
        SourceConfig::Db { location } => Arc::new(DbSource::new(pools.get(config, location).await?)),
    };

    tracing::info!(driver = source.driver(), "permission source ready");
    Ok(source)
}

#[cfg(test)]
mod tests {
    use warden_core::{AccessError, ConfigurationError};

    use super::*;

    #[tokio::test]
    async fn file_driver_reads_configuration_section() {
        let config = AppConfig::from_yaml_str(
            r#"
sections:
  access_control:
    permissions: [hello]
    roles: [user]
    assignments: { user: [hello] }
    filters: { ip: ["10.*"] }
"#,
        )
        .unwrap();

        let source = connect(&config, &mut Pools::default()).await.unwrap();
        assert_eq!(source.driver(), "file");
        assert_eq!(source.permissions().await.unwrap().len(), 1);
        assert!(!source.filters().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_section_is_a_configuration_error() {
        let config = AppConfig::from_yaml_str("{}").unwrap();

        let err = connect(&config, &mut Pools::default()).await.err().unwrap();
        assert_eq!(
            err,
            AccessError::Configuration(ConfigurationError::MissingSection("access_control".into()))
        );
    }

    #[tokio::test]
    async fn db_driver_requires_a_known_connection() {
        let config = AppConfig::from_yaml_str("access_control:\n  source: { driver: db, location: main }\n").unwrap();

        let err = connect(&config, &mut Pools::default()).await.err().unwrap();
        assert_eq!(
            err,
            AccessError::Configuration(ConfigurationError::UnknownConnection("main".into()))
        );
    }
}
