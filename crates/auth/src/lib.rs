//! `warden-auth`: request-time access control policy.
//!
//! This crate is intentionally decoupled from HTTP and storage: collaborators
//! (permission sources, user directories, sessions) are traits implemented by
//! `warden-infra` and `warden-api`.

pub mod authorize;
pub mod engine;
pub mod filter;
pub mod identity;
pub mod permissions;
pub mod resolver;
pub mod roles;
pub mod session;
pub mod source;
pub mod user;

pub use authorize::Assignments;
pub use engine::{AccessControl, AccessDecision, ClientInfo};
pub use filter::{FilterKind, FilterRules};
pub use identity::Identity;
pub use permissions::Permission;
pub use resolver::IdentityResolver;
pub use roles::Role;
pub use session::{SESSION_USER_HASH, SESSION_USER_ID, Session, SessionHasher};
pub use source::{AccessControlDocument, FileSource, PermissionSource};
pub use user::{UserDirectory, UserRecord};
