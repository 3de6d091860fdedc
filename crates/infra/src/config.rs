//! Application configuration.
//!
//! Configuration is a single YAML document. Environment variables override the
//! few values that differ per deployment (bind address, database URL).

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use warden_auth::SessionHasher;
use warden_core::ConfigurationError;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "WARDEN_CONFIG";

/// Configuration file used when [`CONFIG_PATH_ENV`] is not set.
pub const DEFAULT_CONFIG_PATH: &str = "config/warden.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub access_control: AccessControlConfig,

    /// Named database connections (name → URL).
    #[serde(default)]
    pub databases: HashMap<String, String>,

    /// Route table: permission name → path, in match order.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,

    /// Free-form configuration sections addressed by `file` drivers.
    #[serde(default)]
    pub sections: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Prefix prepended to every route path.
    #[serde(default)]
    pub base_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            base_path: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_true")]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: true,
        }
    }
}

/// Where a reader gets its data from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "driver", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Read from `sections` at the dotted key path `location`.
    File { location: String },
    /// Read from the database connection named `location`.
    Db { location: String },
}

impl SourceConfig {
    pub fn driver(&self) -> &'static str {
        match self {
            Self::File { .. } => "file",
            Self::Db { .. } => "db",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessControlConfig {
    /// Permission source (filters, registry, assignments).
    #[serde(default = "default_permission_source")]
    pub source: SourceConfig,

    /// User directory.
    #[serde(default = "default_user_source")]
    pub users: SourceConfig,

    #[serde(default = "default_decision_timeout_ms")]
    pub decision_timeout_ms: u64,

    /// Honour `X-Forwarded-For` and friends when probing the client IP.
    #[serde(default)]
    pub trust_proxy_headers: bool,

    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,

    #[serde(default = "default_session_idle_minutes")]
    pub session_idle_minutes: i64,

    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    /// Pool size for each `db` connection.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for AccessControlConfig {
    fn default() -> Self {
        Self {
            source: default_permission_source(),
            users: default_user_source(),
            decision_timeout_ms: default_decision_timeout_ms(),
            trust_proxy_headers: false,
            session_cookie: default_session_cookie(),
            session_idle_minutes: default_session_idle_minutes(),
            bcrypt_cost: default_bcrypt_cost(),
            max_connections: default_max_connections(),
        }
    }
}

impl AccessControlConfig {
    pub fn decision_timeout(&self) -> Duration {
        Duration::from_millis(self.decision_timeout_ms)
    }

    pub fn session_idle(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_idle_minutes)
    }

    pub fn hasher(&self) -> Result<SessionHasher, ConfigurationError> {
        SessionHasher::new(self.bcrypt_cost)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub permission: String,
    pub path: String,
}

impl AppConfig {
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigurationError> {
        serde_yaml::from_str(raw).map_err(|e| ConfigurationError::invalid(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::invalid(format!("failed to read {}: {e}", path.display())))?;
        Self::from_yaml_str(&raw)
    }

    /// Load from [`CONFIG_PATH_ENV`] (or the default path) and apply
    /// environment overrides.
    pub fn load_from_env() -> Result<Self, ConfigurationError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `WARDEN_BIND` and `DATABASE_URL` overrides.
    ///
    /// `DATABASE_URL` replaces the connection used by every `db` driver.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = lookup("WARDEN_BIND") {
            self.server.bind = bind;
        }

        if let Some(url) = lookup("DATABASE_URL") {
            for source in [&self.access_control.source, &self.access_control.users] {
                if let SourceConfig::Db { location } = source {
                    self.databases.insert(location.clone(), url.clone());
                }
            }
        }
    }

    /// URL of the named database connection.
    pub fn database_url(&self, name: &str) -> Result<&str, ConfigurationError> {
        self.databases
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ConfigurationError::UnknownConnection(name.to_string()))
    }

    /// Look up a configuration section by dotted key path and decode it.
    pub fn section<T>(&self, location: &str) -> Result<T, ConfigurationError>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut node = &self.sections;
        for key in location.split('.').filter(|k| !k.is_empty()) {
            node = node
                .get(key)
                .ok_or_else(|| ConfigurationError::MissingSection(location.to_string()))?;
        }

        serde_yaml::from_value(node.clone())
            .map_err(|e| ConfigurationError::invalid(format!("section '{location}': {e}")))
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_permission_source() -> SourceConfig {
    SourceConfig::File {
        location: "access_control".to_string(),
    }
}

fn default_user_source() -> SourceConfig {
    SourceConfig::File {
        location: "users".to_string(),
    }
}

fn default_decision_timeout_ms() -> u64 {
    2_000
}

fn default_session_cookie() -> String {
    "WARDEN_SESSID".to_string()
}

fn default_session_idle_minutes() -> i64 {
    120
}

fn default_bcrypt_cost() -> u32 {
    SessionHasher::default().cost()
}

fn default_max_connections() -> u32 {
    5
}
