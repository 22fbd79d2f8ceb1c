//! Entities owned by a game session.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The player.
    User,
    /// The narrative provider acting as game master.
    Assistant,
    /// Engine-generated framing text.
    System,
}

impl Role {
    /// Returns the wire/storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            other => Err(DomainError::Validation(format!("unknown role: {other}"))),
        }
    }
}

/// The category of a world fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// An active or resolved quest.
    Quest,
    /// World lore: places, factions, history.
    Lore,
    /// A named character the player has met.
    Character,
}

impl EntryKind {
    /// Returns the wire/storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quest => "quest",
            Self::Lore => "lore",
            Self::Character => "character",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quest" => Ok(Self::Quest),
            "lore" => Ok(Self::Lore),
            "character" => Ok(Self::Character),
            other => Err(DomainError::Validation(format!(
                "unknown entry kind: {other}"
            ))),
        }
    }
}

/// The kind of mutation a change-log record reverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    /// The entry was created; undo deletes it.
    Create,
    /// The entry was updated; undo restores the snapshot.
    Update,
    /// The entry was deleted; undo recreates it from the snapshot.
    Delete,
}

impl ChangeOp {
    /// Returns the wire/storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeOp {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(DomainError::Validation(format!(
                "unknown change operation: {other}"
            ))),
        }
    }
}

/// One independent game/story instance. Root aggregate owning all messages,
/// entries, and change-log records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Free-text starting premise given at creation.
    pub start_prompt: String,
    /// Running summary maintained by compaction; replaced in full, never
    /// appended to, so summary growth stays bounded.
    pub summary: Option<String>,
    /// Timestamp of session creation.
    pub created_at: DateTime<Utc>,
}

/// One chat message in a session's turn history.
///
/// Immutable once created, except for deletion during undo. The
/// (timestamp, id) pair defines turn order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Store-assigned identifier, monotonically increasing.
    pub id: i64,
    /// Owning session.
    pub session_id: Uuid,
    /// Who authored this message.
    pub role: Role,
    /// Free-text content.
    pub content: String,
    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,
}

/// A message not yet persisted; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewMessage {
    /// Owning session.
    pub session_id: Uuid,
    /// Who authored this message.
    pub role: Role,
    /// Free-text content.
    pub content: String,
    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,
}

/// A persisted world fact, keyed by (session, kind, title).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Store-assigned identifier.
    pub id: i64,
    /// Owning session.
    pub session_id: Uuid,
    /// Category of this fact.
    pub kind: EntryKind,
    /// Display name, unique per (session, kind).
    pub title: String,
    /// Free-text content.
    pub content: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Append-only record of one entry mutation, enabling whole-turn reversal.
///
/// Records are consumed (and deleted) only by undo replay, which walks them
/// in descending-id order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogRecord {
    /// Store-assigned identifier; descending id is reverse creation order.
    pub id: i64,
    /// Owning session.
    pub session_id: Uuid,
    /// The assistant message whose processing produced this change.
    pub message_id: i64,
    /// The affected entry.
    pub entry_id: i64,
    /// Which mutation happened.
    pub op: ChangeOp,
    /// Full prior field values of the entry; `None` for create.
    pub previous_state: Option<serde_json::Value>,
    /// Timestamp of record creation.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_kind_rejects_unknown_string() {
        let err = "artifact".parse::<EntryKind>().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn test_role_storage_representation_round_trips() {
        for role in [Role::User, Role::Assistant, Role::System] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_entry_snapshot_preserves_temporal_fields() {
        let entry = Entry {
            id: 7,
            session_id: Uuid::new_v4(),
            kind: EntryKind::Character,
            title: "Bob".to_owned(),
            content: "friendly".to_owned(),
            created_at: chrono::TimeZone::with_ymd_and_hms(&Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
        };

        let snapshot = serde_json::to_value(&entry).unwrap();
        let restored: Entry = serde_json::from_value(snapshot).unwrap();

        assert_eq!(restored, entry);
    }
}
