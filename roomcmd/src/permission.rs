//! Group-based command permissions.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::DispatchError;
use crate::store::PermissionStore;

/// Outcome of a permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionDecision {
    Allow,
    /// Carries the groups that would have been allowed.
    Deny(Vec<String>),
}

/// Decide whether a user in `groups` may run a command restricted to
/// `allowed`. An empty `allowed` set means unrestricted; membership in
/// `admin_group` always allows.
pub fn decide(
    allowed: &BTreeSet<String>,
    groups: &BTreeSet<String>,
    admin_group: &str,
) -> PermissionDecision {
    if groups.contains(admin_group) || allowed.is_empty() || !allowed.is_disjoint(groups) {
        PermissionDecision::Allow
    } else {
        PermissionDecision::Deny(allowed.iter().cloned().collect())
    }
}

/// Checks resolved commands against the permission store.
#[derive(Clone)]
pub struct PermissionGate {
    store: Arc<dyn PermissionStore>,
    admin_group: String,
}

impl PermissionGate {
    pub fn new(store: Arc<dyn PermissionStore>, admin_group: impl Into<String>) -> Self {
        Self {
            store,
            admin_group: admin_group.into(),
        }
    }

    pub fn admin_group(&self) -> &str {
        &self.admin_group
    }

    /// Look up the rules for `command` and apply [`decide`].
    pub async fn check(&self, command: &str, groups: &BTreeSet<String>) -> Result<(), DispatchError> {
        let allowed = self.store.lookup(command).await?;
        match decide(&allowed, groups, &self.admin_group) {
            PermissionDecision::Allow => Ok(()),
            PermissionDecision::Deny(allowed) => {
                tracing::info!(command, ?groups, "Permission denied");
                Err(DispatchError::PermissionDenied { allowed })
            }
        }
    }
}

impl std::fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionGate")
            .field("admin_group", &self.admin_group)
            .finish_non_exhaustive()
    }
}
