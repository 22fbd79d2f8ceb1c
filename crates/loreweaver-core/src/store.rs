//! Persistence abstraction for session state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;
use crate::model::{ChangeLogRecord, Entry, EntryKind, Message, NewMessage, Session};

/// One resolved entry mutation, ready to persist together with its
/// change-log record. Produced by the journal manager after reconciling a
/// provider proposal against current entries.
#[derive(Debug, Clone, PartialEq)]
pub enum JournalAction {
    /// Insert a new entry and record a `create` with no prior state.
    Create {
        /// Category of the new entry.
        kind: EntryKind,
        /// Title of the new entry.
        title: String,
        /// Content of the new entry.
        content: String,
    },
    /// Overwrite an entry's content and record an `update` with the full
    /// prior snapshot.
    Update {
        /// The entry to mutate.
        entry_id: i64,
        /// Replacement content; `None` leaves content unchanged (the record
        /// is still written so the turn remains reversible).
        content: Option<String>,
        /// Serialized prior field values, captured before mutation.
        previous_state: serde_json::Value,
    },
    /// Remove an entry and record a `delete` with the full prior snapshot.
    Delete {
        /// The entry to remove.
        entry_id: i64,
        /// Serialized prior field values, captured before deletion.
        previous_state: serde_json::Value,
    },
}

/// One step of undo replay, in strict reverse-creation order.
#[derive(Debug, Clone, PartialEq)]
pub enum UndoStep {
    /// Reverses a `create`: delete the entry it produced.
    RemoveEntry(i64),
    /// Reverses an `update`: overwrite the entry's fields with the snapshot.
    RestoreEntry(Entry),
    /// Reverses a `delete`: re-insert the entry from the snapshot.
    RecreateEntry(Entry),
}

/// A fully-resolved undo of one turn, applied as a single transaction.
#[derive(Debug, Clone)]
pub struct UndoPlan {
    /// Owning session.
    pub session_id: Uuid,
    /// Replay steps in descending record-id order.
    pub steps: Vec<UndoStep>,
    /// Consumed change-log records to delete.
    pub record_ids: Vec<i64>,
    /// Messages of the undone turn to delete.
    pub message_ids: Vec<i64>,
}

/// Repository trait for session state: sessions, messages, entries, and the
/// change log.
///
/// Ordered-range semantics matter to callers: `recent_messages` returns the
/// newest window oldest-first, `entries` ascends by id (insertion order),
/// and `records_for_messages` descends by id (reverse creation order).
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Persist a freshly created session.
    async fn create_session(&self, session: &Session) -> Result<(), DomainError>;

    /// Load a session by id.
    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, DomainError>;

    /// List sessions, newest first, with offset/limit pagination.
    async fn list_sessions(&self, offset: i64, limit: i64) -> Result<Vec<Session>, DomainError>;

    /// Delete a session and everything it owns.
    async fn delete_session(&self, id: Uuid) -> Result<(), DomainError>;

    /// Replace the session's running summary in full.
    async fn set_summary(&self, id: Uuid, summary: &str) -> Result<(), DomainError>;

    /// Insert a message, assigning its id.
    async fn insert_message(&self, message: NewMessage) -> Result<Message, DomainError>;

    /// A window over a session's messages counted from the newest end:
    /// skip the `offset` most recent, then take up to `limit`, returned
    /// oldest-first.
    async fn recent_messages(
        &self,
        session_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Message>, DomainError>;

    /// Total number of messages in a session.
    async fn count_messages(&self, session_id: Uuid) -> Result<i64, DomainError>;

    /// The most recent message with role `user`, if any.
    async fn last_user_message(&self, session_id: Uuid) -> Result<Option<Message>, DomainError>;

    /// All messages with a timestamp at or after `since`, oldest-first.
    async fn messages_at_or_after(
        &self,
        session_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Message>, DomainError>;

    /// All entries of a session, ascending by id.
    async fn entries(&self, session_id: Uuid) -> Result<Vec<Entry>, DomainError>;

    /// Look up an entry by its (session, kind, title) identity.
    async fn find_entry(
        &self,
        session_id: Uuid,
        kind: EntryKind,
        title: &str,
    ) -> Result<Option<Entry>, DomainError>;

    /// Apply one turn's entry mutations and change-log records atomically.
    /// Every record references `message_id` and carries `recorded_at`.
    async fn apply_journal_batch(
        &self,
        session_id: Uuid,
        message_id: i64,
        recorded_at: DateTime<Utc>,
        actions: Vec<JournalAction>,
    ) -> Result<(), DomainError>;

    /// Change-log records referencing any of `message_ids`, descending by id.
    async fn records_for_messages(
        &self,
        session_id: Uuid,
        message_ids: &[i64],
    ) -> Result<Vec<ChangeLogRecord>, DomainError>;

    /// Apply an undo plan atomically: replay steps in order, then delete the
    /// consumed records and the undone messages.
    async fn apply_undo(&self, plan: UndoPlan) -> Result<(), DomainError>;
}
