//! Request-level blocklist filtering (client IP and user agent).
//!
//! Filters run before identity or authorization logic and are independent of
//! who the caller is. A filter kind blocks a request when any of its patterns
//! matches the probed value.

use core::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use warden_core::ConfigurationError;

/// A filter kind the request filter knows how to probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Ip,
    UserAgent,
}

impl FilterKind {
    /// Resolve a configured kind name.
    ///
    /// Legacy `ip_filter` / `useragent_filter` names are accepted as aliases.
    pub fn parse(name: &str) -> Result<Self, ConfigurationError> {
        match name {
            "ip" | "ip_filter" => Ok(Self::Ip),
            "user_agent" | "useragent_filter" => Ok(Self::UserAgent),
            other => Err(ConfigurationError::UnknownFilter(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ip => "ip",
            Self::UserAgent => "user_agent",
        }
    }
}

/// Ordered mapping of filter kind name → blocklist patterns.
///
/// Kind names stay raw strings until evaluation so that an unknown kind is
/// reported when it is reached, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterRules {
    entries: Vec<(String, Vec<String>)>,
}

impl FilterRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the patterns for `kind`.
    ///
    /// Replacing keeps the kind's original position.
    pub fn insert(&mut self, kind: impl Into<String>, patterns: Vec<String>) {
        let kind = kind.into();
        match self.entries.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, existing)) => *existing = patterns,
            None => self.entries.push((kind, patterns)),
        }
    }

    pub fn with(mut self, kind: impl Into<String>, patterns: &[&str]) -> Self {
        self.insert(kind, patterns.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn get(&self, kind: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == kind)
            .map(|(_, patterns)| patterns.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Serialize for FilterRules {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (kind, patterns) in &self.entries {
            map.serialize_entry(kind, patterns)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FilterRules {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RulesVisitor;

        impl<'de> Visitor<'de> for RulesVisitor {
            type Value = FilterRules;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of filter kind to pattern list")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut rules = FilterRules::new();
                while let Some((kind, patterns)) =
                    access.next_entry::<String, Option<Vec<String>>>()?
                {
                    rules.insert(kind, patterns.unwrap_or_default());
                }
                Ok(rules)
            }
        }

        deserializer.deserialize_map(RulesVisitor)
    }
}

/// Evaluate all filters against the client attributes (true = allow).
///
/// Kinds are checked in insertion order and the first blocking kind stops
/// evaluation. An unknown kind is a configuration bug and is returned as an
/// error once reached.
pub fn evaluate(
    filters: &FilterRules,
    client_ip: &str,
    user_agent: &str,
) -> Result<bool, ConfigurationError> {
    for (name, patterns) in filters.iter() {
        let kind = FilterKind::parse(name)?;
        let probe = match kind {
            FilterKind::Ip => client_ip,
            FilterKind::UserAgent => user_agent,
        };

        if is_blocked(patterns, probe) {
            tracing::debug!(filter = kind.as_str(), value = probe, "request blocked by filter");
            return Ok(false);
        }
    }

    Ok(true)
}

/// Whether `value` matches any blocklist pattern.
///
/// An empty blocklist or an unobservable (empty) value never blocks.
pub fn is_blocked(patterns: &[String], value: &str) -> bool {
    if patterns.is_empty() || value.is_empty() {
        return false;
    }

    patterns.iter().any(|pattern| pattern_matches(value, pattern))
}

/// Match `value` against a pattern with optional leading/trailing `*`.
///
/// - `*x*` → `value` contains `x`
/// - `*x` → `value` ends with `x`
/// - `x*` → `value` starts with `x`
/// - `x` → exact match
pub fn pattern_matches(value: &str, pattern: &str) -> bool {
    let leading = pattern.starts_with('*');
    let trailing = pattern.ends_with('*');

    match (leading, trailing) {
        (true, true) => value.contains(pattern.trim_matches('*')),
        (true, false) => value.ends_with(pattern.trim_start_matches('*')),
        (false, true) => value.starts_with(pattern.trim_end_matches('*')),
        (false, false) => value == pattern,
    }
}
