//! Session contract and session-hash binding.
//!
//! A signed-in session stores the user id and a bcrypt hash of a fingerprint
//! derived from the user's stored password hash, their per-user token and the
//! browser's user agent. Changing any of the three invalidates the session.

use bcrypt::{BcryptError, hash, verify};
use sha1::{Digest, Sha1};

use warden_core::ConfigurationError;

/// Session key holding the signed-in user id.
pub const SESSION_USER_ID: &str = "__sessid";

/// Session key holding the session hash.
pub const SESSION_USER_HASH: &str = "__sesshash";

/// Key/value session collaborator.
pub trait Session {
    fn has(&self, key: &str) -> bool;

    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: String);

    /// Remove `key`, returning its previous value.
    fn unset(&mut self, key: &str) -> Option<String>;
}

/// Computes and verifies session hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionHasher {
    cost: u32,
}

impl SessionHasher {
    /// Lowest cost bcrypt accepts.
    pub const MIN_COST: u32 = 4;
    /// Highest cost bcrypt accepts.
    pub const MAX_COST: u32 = 31;

    pub fn new(cost: u32) -> Result<Self, ConfigurationError> {
        if !(Self::MIN_COST..=Self::MAX_COST).contains(&cost) {
            return Err(ConfigurationError::invalid(format!(
                "bcrypt cost must be between {} and {}, got {cost}",
                Self::MIN_COST,
                Self::MAX_COST
            )));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// `hex(sha1(password + token)) + ":" + user_agent`
    pub fn fingerprint(password: &str, token: &str, user_agent: &str) -> String {
        let mut hasher = Sha1::new();
        hasher.update(password.as_bytes());
        hasher.update(token.as_bytes());
        format!("{}:{}", hex::encode(hasher.finalize()), user_agent)
    }

    /// Input handed to bcrypt: `hex(sha1(fingerprint))`.
    ///
    /// bcrypt ignores everything past 72 bytes and the digest prefix already
    /// takes 41 of them, so the raw fingerprint would only bind the first 31
    /// bytes of the user agent. Digesting it keeps the whole agent bound.
    fn binding(password: &str, token: &str, user_agent: &str) -> String {
        hex::encode(Sha1::digest(Self::fingerprint(password, token, user_agent).as_bytes()))
    }

    /// Hash a fresh session binding for storage in the session.
    pub fn issue(&self, password: &str, token: &str, user_agent: &str) -> Result<String, BcryptError> {
        hash(Self::binding(password, token, user_agent), self.cost)
    }

    /// Verify a stored session hash.
    ///
    /// The comparison is bcrypt's constant-time check; a malformed stored hash
    /// verifies as false.
    pub fn verify(&self, password: &str, token: &str, user_agent: &str, stored: &str) -> bool {
        verify(Self::binding(password, token, user_agent), stored).unwrap_or(false)
    }
}

impl Default for SessionHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}
