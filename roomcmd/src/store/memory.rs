use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{PermissionStore, StoreError, TrickStore, UserStore};
use crate::event::{User, UserId};

/// In-memory store for tests or session-only bots
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<UserId, User>>,
    permissions: RwLock<BTreeMap<String, BTreeSet<String>>>,
    tricks: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user with its groups, replacing any existing record.
    pub async fn insert_user(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn upsert(&self, id: UserId, name: &str) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        let user = users.entry(id).or_insert_with(|| User::new(id, name));
        user.name = name.to_string();
        Ok(user.clone())
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn add_to_group(&self, id: UserId, group: &str) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(StoreError::UnknownUser(id))?;
        Ok(user.groups.insert(group.to_string()))
    }

    async fn remove_from_group(&self, id: UserId, group: &str) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(StoreError::UnknownUser(id))?;
        Ok(user.groups.remove(group))
    }

    async fn members(&self, group: &str) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().await;
        let mut members: Vec<User> = users
            .values()
            .filter(|user| user.in_group(group))
            .cloned()
            .collect();
        members.sort_by_key(|user| user.id);
        Ok(members)
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn lookup(&self, command: &str) -> Result<BTreeSet<String>, StoreError> {
        Ok(self
            .permissions
            .read()
            .await
            .get(command)
            .cloned()
            .unwrap_or_default())
    }

    async fn allow(&self, command: &str, group: &str) -> Result<bool, StoreError> {
        let mut permissions = self.permissions.write().await;
        Ok(permissions
            .entry(command.to_string())
            .or_default()
            .insert(group.to_string()))
    }

    async fn revoke(&self, command: &str, group: &str) -> Result<bool, StoreError> {
        let mut permissions = self.permissions.write().await;
        let Some(groups) = permissions.get_mut(command) else {
            return Ok(false);
        };
        let removed = groups.remove(group);
        if groups.is_empty() {
            permissions.remove(command);
        }
        Ok(removed)
    }
}

#[async_trait]
impl TrickStore for MemoryStore {
    async fn lookup(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.tricks.read().await.get(name).cloned())
    }

    async fn set(&self, name: &str, body: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .tricks
            .write()
            .await
            .insert(name.to_string(), body.to_string()))
    }

    async fn remove(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.tricks.write().await.remove(name).is_some())
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.tricks.read().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_creates_then_renames() {
        let store = MemoryStore::new();
        let user = store.upsert(7, "alice").await.unwrap();
        assert!(user.groups.is_empty());

        store.add_to_group(7, "mods").await.unwrap();
        let user = store.upsert(7, "alice2").await.unwrap();
        assert_eq!(user.name, "alice2");
        assert!(user.in_group("mods"));
    }

    #[tokio::test]
    async fn test_group_membership() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.add_to_group(1, "x").await,
            Err(StoreError::UnknownUser(1))
        ));

        store.upsert(1, "a").await.unwrap();
        store.upsert(2, "b").await.unwrap();
        assert!(store.add_to_group(2, "x").await.unwrap());
        assert!(!store.add_to_group(2, "x").await.unwrap());
        assert!(store.add_to_group(1, "x").await.unwrap());

        let members = store.members("x").await.unwrap();
        assert_eq!(members.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 2]);

        assert!(store.remove_from_group(1, "x").await.unwrap());
        assert!(!store.remove_from_group(1, "x").await.unwrap());
    }

    #[tokio::test]
    async fn test_permissions() {
        let store = MemoryStore::new();
        assert!(PermissionStore::lookup(&store, "trick add")
            .await
            .unwrap()
            .is_empty());

        assert!(store.allow("trick add", "mods").await.unwrap());
        assert!(!store.allow("trick add", "mods").await.unwrap());
        let groups = PermissionStore::lookup(&store, "trick add").await.unwrap();
        assert!(groups.contains("mods"));

        assert!(store.revoke("trick add", "mods").await.unwrap());
        assert!(!store.revoke("trick add", "mods").await.unwrap());
    }

    #[tokio::test]
    async fn test_tricks() {
        let store = MemoryStore::new();
        assert_eq!(store.set("hi", "hello").await.unwrap(), None);
        assert_eq!(
            store.set("hi", "hey").await.unwrap(),
            Some("hello".to_string())
        );
        assert_eq!(
            TrickStore::lookup(&store, "hi").await.unwrap(),
            Some("hey".to_string())
        );
        assert_eq!(store.list().await.unwrap(), vec!["hi".to_string()]);
        assert!(TrickStore::remove(&store, "hi").await.unwrap());
        assert!(!TrickStore::remove(&store, "hi").await.unwrap());
    }
}
