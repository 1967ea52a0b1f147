//! Chat events and identities.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub type MessageId = u64;
pub type UserId = u64;

/// A message posted in the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub message_id: MessageId,
    pub user_id: UserId,
    pub user_name: String,
    /// Content as delivered by the event feed; may be rendered markup.
    pub content: String,
}

/// A chat identity and its group memberships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub groups: BTreeSet<String>,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            groups: BTreeSet::new(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }
}
