//! Persistent state consulted during dispatch.
//!
//! The dispatcher never caches what it reads here: permission rules and
//! tricks are looked up fresh for every command, so edits take effect on the
//! next message.
//!
//! Three traits, one per concern:
//!
//! - [`UserStore`]: chat identities and their groups
//! - [`PermissionStore`]: command name to allowed groups
//! - [`TrickStore`]: canned replies for unknown command names
//!
//! [`MemoryStore`] implements all three for tests and throwaway sessions.

mod memory;

pub use memory::MemoryStore;

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::event::{User, UserId};

/// Error type for store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access store: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store data is corrupt: {0}")]
    Corrupt(String),

    #[error("No user with id {0}")]
    UnknownUser(UserId),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create the user on first sight, otherwise refresh the display name.
    /// Never creates groups.
    async fn upsert(&self, id: UserId, name: &str) -> Result<User, StoreError>;

    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Returns `false` if the user was already a member.
    async fn add_to_group(&self, id: UserId, group: &str) -> Result<bool, StoreError>;

    /// Returns `false` if the user was not a member.
    async fn remove_from_group(&self, id: UserId, group: &str) -> Result<bool, StoreError>;

    async fn members(&self, group: &str) -> Result<Vec<User>, StoreError>;
}

#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Groups allowed to run `command`. Empty means unrestricted.
    async fn lookup(&self, command: &str) -> Result<BTreeSet<String>, StoreError>;

    /// Returns `false` if the rule already existed.
    async fn allow(&self, command: &str, group: &str) -> Result<bool, StoreError>;

    /// Returns `false` if there was no such rule.
    async fn revoke(&self, command: &str, group: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait TrickStore: Send + Sync {
    async fn lookup(&self, name: &str) -> Result<Option<String>, StoreError>;

    /// Returns the previous body, if any.
    async fn set(&self, name: &str, body: &str) -> Result<Option<String>, StoreError>;

    /// Returns `false` if there was no such trick.
    async fn remove(&self, name: &str) -> Result<bool, StoreError>;

    /// All trick names, sorted.
    async fn list(&self) -> Result<Vec<String>, StoreError>;
}

/// The three stores a dispatcher needs, shared.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub permissions: Arc<dyn PermissionStore>,
    pub tricks: Arc<dyn TrickStore>,
}

impl Stores {
    pub fn new(
        users: Arc<dyn UserStore>,
        permissions: Arc<dyn PermissionStore>,
        tricks: Arc<dyn TrickStore>,
    ) -> Self {
        Self {
            users,
            permissions,
            tricks,
        }
    }

    /// Use one backend for all three concerns.
    pub fn shared<T>(store: Arc<T>) -> Self
    where
        T: UserStore + PermissionStore + TrickStore + 'static,
    {
        Self {
            users: store.clone(),
            permissions: store.clone(),
            tricks: store,
        }
    }

    /// A fresh in-memory backend.
    pub fn in_memory() -> Self {
        Self::shared(Arc::new(MemoryStore::new()))
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}
