//! Route table: maps a request path to the permission named after its route.

use warden_infra::RouteConfig;

/// Looks up the permission guarding a request path.
pub trait RouteResolver: Send + Sync {
    /// Permission of the first route matching `path`, or `""` when none does.
    fn permission_for(&self, path: &str) -> &str;
}

/// Canonical form of a configured base path: `""` for the root, otherwise a
/// leading `/` and no trailing one.
pub fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RouteEntry {
    permission: String,
    path: String,
    /// Literal text before the first placeholder, for parameterized paths.
    prefix: Option<String>,
}

impl RouteEntry {
    fn new(base_path: &str, permission: &str, path: &str) -> Self {
        let path = match path {
            "/" if !base_path.is_empty() => base_path.to_string(),
            _ => format!("{base_path}{path}"),
        };
        let prefix = path.find(['{', '[']).map(|pos| path[..pos].to_string());

        Self {
            permission: permission.to_string(),
            path,
            prefix,
        }
    }

    fn matches(&self, request_path: &str) -> bool {
        match &self.prefix {
            Some(prefix) => request_path.starts_with(prefix.as_str()),
            None => request_path == self.path,
        }
    }
}

/// Ordered `(permission, path)` routes; the first match wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    base_path: String,
    routes: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: normalize_base_path(&base_path.into()),
            routes: Vec::new(),
        }
    }

    pub fn from_config(base_path: &str, routes: &[RouteConfig]) -> Self {
        routes
            .iter()
            .fold(Self::new(base_path), |table, route| table.route(&route.permission, &route.path))
    }

    /// Append a route. Paths containing `{` or `[` match by their literal
    /// prefix; all others match exactly.
    pub fn route(mut self, permission: &str, path: &str) -> Self {
        self.routes.push(RouteEntry::new(&self.base_path, permission, path));
        self
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl RouteResolver for RouteTable {
    fn permission_for(&self, path: &str) -> &str {
        self.routes
            .iter()
            .find(|route| route.matches(path))
            .map(|route| route.permission.as_str())
            .unwrap_or("")
    }
}
