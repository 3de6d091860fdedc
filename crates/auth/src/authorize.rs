//! Pure authorization checks (no I/O).

use std::collections::HashMap;

use crate::{Permission, Role};

/// Role → permissions granted to that role.
///
/// A role without an entry grants nothing.
pub type Assignments = HashMap<Role, Vec<Permission>>;

/// Whether `permission` is gated behind authentication.
///
/// Only permissions listed in the registry require authentication. An empty
/// permission or an empty registry means nothing is gated.
pub fn is_authentication_required(registry: &[Permission], permission: &str) -> bool {
    if permission.is_empty() || registry.is_empty() {
        return false;
    }

    registry.iter().any(|p| p.as_str() == permission)
}

/// Whether any of `roles` is assigned `permission`.
///
/// Roles are checked in the order given and the first granting role wins.
/// Membership is strict string equality.
pub fn authorize(assignments: &Assignments, roles: &[Role], permission: &str) -> bool {
    if permission.is_empty() || roles.is_empty() {
        return false;
    }

    roles.iter().any(|role| {
        assignments
            .get(role.as_str())
            .is_some_and(|granted| granted.iter().any(|p| p.as_str() == permission))
    })
}

/// Roles among `roles` that grant `permission` (for audit logging).
pub fn granting_roles<'a>(
    assignments: &Assignments,
    roles: &'a [Role],
    permission: &str,
) -> Vec<&'a Role> {
    roles
        .iter()
        .filter(|role| {
            assignments
                .get(role.as_str())
                .is_some_and(|granted| granted.iter().any(|p| p.as_str() == permission))
        })
        .collect()
}
