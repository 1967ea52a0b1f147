//! JSON file store.
//!
//! The whole document lives in memory behind one lock and is rewritten after
//! every change:
//!
//! ```json
//! {
//!   "version": 1,
//!   "users": { "1": { "name": "alice", "groups": ["admin"], "last_seen": "..." } },
//!   "permissions": { "trick add": ["admin", "mods"] },
//!   "tricks": { "rules": "Be nice." }
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roomcmd::{PermissionStore, StoreError, TrickStore, User, UserId, UserStore};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRecord {
    name: String,
    #[serde(default)]
    groups: BTreeSet<String>,
    last_seen: DateTime<Utc>,
}

impl UserRecord {
    fn to_user(&self, id: UserId) -> User {
        User {
            id,
            name: self.name.clone(),
            groups: self.groups.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreDocument {
    version: u32,
    #[serde(default)]
    users: BTreeMap<UserId, UserRecord>,
    #[serde(default)]
    permissions: BTreeMap<String, BTreeSet<String>>,
    #[serde(default)]
    tricks: BTreeMap<String, String>,
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            users: BTreeMap::new(),
            permissions: BTreeMap::new(),
            tricks: BTreeMap::new(),
        }
    }
}

/// Users, permissions and tricks in one JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    data: RwLock<StoreDocument>,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let data = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let data: StoreDocument = serde_json::from_reader(reader)
                .map_err(|e| StoreError::Corrupt(format!("{}: {}", path.display(), e)))?;
            if data.version > CURRENT_VERSION {
                return Err(StoreError::Corrupt(format!(
                    "{}: unsupported store version {}",
                    path.display(),
                    data.version
                )));
            }
            data
        } else {
            StoreDocument::default()
        };

        tracing::debug!(path = %path.display(), users = data.users.len(), "Opened store");
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When a user last sent a command.
    pub async fn last_seen(&self, id: UserId) -> Option<DateTime<Utc>> {
        self.data.read().await.users.get(&id).map(|u| u.last_seen)
    }

    /// Apply `change` to a copy of the document, persist the copy, then
    /// make it live.
    ///
    /// A failed change or save leaves the in-memory document untouched. The
    /// write lock is held across the save so files land in change order.
    async fn update<T>(
        &self,
        change: impl FnOnce(&mut StoreDocument) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut data = self.data.write().await;
        let mut staged = data.clone();
        let out = change(&mut staged)?;
        if let Err(e) = self.save(&staged).await {
            tracing::error!(path = %self.path.display(), error = %e, "Failed to save store");
            return Err(e);
        }
        *data = staged;
        Ok(out)
    }

    /// Write to a sibling temp file and rename it over the store, so the
    /// store file is always either the old or the new document.
    async fn save(&self, data: &StoreDocument) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(data)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);
        tokio::fs::write(&temp, json).await?;
        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for FileStore {
    async fn upsert(&self, id: UserId, name: &str) -> Result<User, StoreError> {
        self.update(|data| {
            let now = Utc::now();
            let record = data.users.entry(id).or_insert_with(|| UserRecord {
                name: name.to_string(),
                groups: BTreeSet::new(),
                last_seen: now,
            });
            record.name = name.to_string();
            record.last_seen = now;
            Ok(record.to_user(id))
        })
        .await
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.data.read().await.users.get(&id).map(|r| r.to_user(id)))
    }

    async fn add_to_group(&self, id: UserId, group: &str) -> Result<bool, StoreError> {
        self.update(|data| {
            let record = data.users.get_mut(&id).ok_or(StoreError::UnknownUser(id))?;
            Ok(record.groups.insert(group.to_string()))
        })
        .await
    }

    async fn remove_from_group(&self, id: UserId, group: &str) -> Result<bool, StoreError> {
        self.update(|data| {
            let record = data.users.get_mut(&id).ok_or(StoreError::UnknownUser(id))?;
            Ok(record.groups.remove(group))
        })
        .await
    }

    async fn members(&self, group: &str) -> Result<Vec<User>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .users
            .iter()
            .filter(|(_, record)| record.groups.contains(group))
            .map(|(id, record)| record.to_user(*id))
            .collect())
    }
}

#[async_trait]
impl PermissionStore for FileStore {
    async fn lookup(&self, command: &str) -> Result<BTreeSet<String>, StoreError> {
        let data = self.data.read().await;
        Ok(data.permissions.get(command).cloned().unwrap_or_default())
    }

    async fn allow(&self, command: &str, group: &str) -> Result<bool, StoreError> {
        self.update(|data| {
            Ok(data
                .permissions
                .entry(command.to_string())
                .or_default()
                .insert(group.to_string()))
        })
        .await
    }

    async fn revoke(&self, command: &str, group: &str) -> Result<bool, StoreError> {
        self.update(|data| {
            let Some(groups) = data.permissions.get_mut(command) else {
                return Ok(false);
            };
            let removed = groups.remove(group);
            if groups.is_empty() {
                data.permissions.remove(command);
            }
            Ok(removed)
        })
        .await
    }
}

#[async_trait]
impl TrickStore for FileStore {
    async fn lookup(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.data.read().await.tricks.get(name).cloned())
    }

    async fn set(&self, name: &str, body: &str) -> Result<Option<String>, StoreError> {
        self.update(|data| Ok(data.tricks.insert(name.to_string(), body.to_string())))
            .await
    }

    async fn remove(&self, name: &str) -> Result<bool, StoreError> {
        self.update(|data| Ok(data.tricks.remove(name).is_some()))
            .await
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.data.read().await.tricks.keys().cloned().collect())
    }
}
