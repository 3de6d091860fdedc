//! Access-control error model.

use thiserror::Error;

/// Result type used across the access-control layers.
pub type AccessResult<T> = Result<T, AccessError>;

/// A configuration defect.
///
/// These are bugs in the deployed configuration, not per-request conditions.
/// They are never recovered from locally and surface as a 500-level response.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A filter section names a kind the request filter does not know.
    #[error("filter '{0}' not supported")]
    UnknownFilter(String),

    /// A configuration section the permission source needs is absent.
    #[error("missing configuration section '{0}'")]
    MissingSection(String),

    /// A database source refers to a connection that is not configured.
    #[error("unknown database connection '{0}'")]
    UnknownConnection(String),

    /// The configuration document could not be read or decoded.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigurationError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Error raised while rendering an access decision.
///
/// Soft conditions (missing user, missing session fields, missing role
/// assignment, hash mismatch) are not errors: they degrade to an anonymous
/// identity or a denial.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The permission source backend failed (I/O, query, decoding).
    #[error("permission source failure: {0}")]
    Source(String),

    /// The decision did not complete before its deadline.
    #[error("access decision timed out")]
    Timeout,
}

impl AccessError {
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Whether this error is a configuration bug rather than a backend outage.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
