//! `warden-core`: shared building blocks for the access-control crates.
//!
//! This crate carries no I/O: only the error model, identifiers and the
//! multi-value column codec used at storage boundaries.

pub mod error;
pub mod id;
pub mod separator;

pub use error::{AccessError, AccessResult, ConfigurationError};
pub use id::{SessionId, UserId};
pub use separator::{SEPARATOR, join_values, split_values};
