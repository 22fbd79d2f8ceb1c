//! In-memory `GameStore` — full repository implementation for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use loreweaver_core::error::DomainError;
use loreweaver_core::model::{
    ChangeLogRecord, ChangeOp, Entry, EntryKind, Message, NewMessage, Session,
};
use loreweaver_core::store::{GameStore, JournalAction, UndoPlan, UndoStep};

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<Uuid, Session>,
    messages: Vec<Message>,
    entries: Vec<Entry>,
    records: Vec<ChangeLogRecord>,
    next_message_id: i64,
    next_entry_id: i64,
    next_record_id: i64,
}

/// An in-memory `GameStore` with the same ordering and uniqueness semantics
/// as the SQLite implementation. Journal batches and undo plans are applied
/// under one lock acquisition, so they are atomic with respect to readers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all change-log records, for assertions.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn all_records(&self) -> Vec<ChangeLogRecord> {
        self.inner.lock().unwrap().records.clone()
    }

    /// Snapshot of all messages, for assertions.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn all_messages(&self) -> Vec<Message> {
        self.inner.lock().unwrap().messages.clone()
    }
}

impl Inner {
    fn session_messages(&self, session_id: Uuid) -> Vec<Message> {
        let mut messages: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| (m.timestamp, m.id));
        messages
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn create_session(&self, session: &Session) -> Result<(), DomainError> {
        let mut inner = self.inner.lock().unwrap();
        inner.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, DomainError> {
        Ok(self.inner.lock().unwrap().sessions.get(&id).cloned())
    }

    async fn list_sessions(&self, offset: i64, limit: i64) -> Result<Vec<Session>, DomainError> {
        let inner = self.inner.lock().unwrap();
        let mut sessions: Vec<Session> = inner.sessions.values().cloned().collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect())
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), DomainError> {
        let mut inner = self.inner.lock().unwrap();
        inner.sessions.remove(&id);
        inner.messages.retain(|m| m.session_id != id);
        inner.entries.retain(|e| e.session_id != id);
        inner.records.retain(|r| r.session_id != id);
        Ok(())
    }

    async fn set_summary(&self, id: Uuid, summary: &str) -> Result<(), DomainError> {
        let mut inner = self.inner.lock().unwrap();
        let session = inner
            .sessions
            .get_mut(&id)
            .ok_or(DomainError::SessionNotFound(id))?;
        session.summary = Some(summary.to_owned());
        Ok(())
    }

    async fn insert_message(&self, message: NewMessage) -> Result<Message, DomainError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_message_id += 1;
        let message = Message {
            id: inner.next_message_id,
            session_id: message.session_id,
            role: message.role,
            content: message.content,
            timestamp: message.timestamp,
        };
        inner.messages.push(message.clone());
        Ok(message)
    }

    async fn recent_messages(
        &self,
        session_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Message>, DomainError> {
        let inner = self.inner.lock().unwrap();
        let mut messages = inner.session_messages(session_id);
        let drop_newest = usize::try_from(offset).unwrap_or(0).min(messages.len());
        messages.truncate(messages.len() - drop_newest);
        let keep = usize::try_from(limit).unwrap_or(0);
        let skip = messages.len().saturating_sub(keep);
        Ok(messages.into_iter().skip(skip).collect())
    }

    async fn count_messages(&self, session_id: Uuid) -> Result<i64, DomainError> {
        let inner = self.inner.lock().unwrap();
        let count = inner
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn last_user_message(&self, session_id: Uuid) -> Result<Option<Message>, DomainError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .session_messages(session_id)
            .into_iter()
            .filter(|m| m.role == loreweaver_core::model::Role::User)
            .next_back())
    }

    async fn messages_at_or_after(
        &self,
        session_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Message>, DomainError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .session_messages(session_id)
            .into_iter()
            .filter(|m| m.timestamp >= since)
            .collect())
    }

    async fn entries(&self, session_id: Uuid) -> Result<Vec<Entry>, DomainError> {
        let inner = self.inner.lock().unwrap();
        let mut entries: Vec<Entry> = inner
            .entries
            .iter()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.id);
        Ok(entries)
    }

    async fn find_entry(
        &self,
        session_id: Uuid,
        kind: EntryKind,
        title: &str,
    ) -> Result<Option<Entry>, DomainError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .entries
            .iter()
            .find(|e| e.session_id == session_id && e.kind == kind && e.title == title)
            .cloned())
    }

    async fn apply_journal_batch(
        &self,
        session_id: Uuid,
        message_id: i64,
        recorded_at: DateTime<Utc>,
        actions: Vec<JournalAction>,
    ) -> Result<(), DomainError> {
        let mut inner = self.inner.lock().unwrap();

        for action in actions {
            let (entry_id, op, previous_state) = match action {
                JournalAction::Create {
                    kind,
                    title,
                    content,
                } => {
                    let duplicate = inner
                        .entries
                        .iter()
                        .any(|e| e.session_id == session_id && e.kind == kind && e.title == title);
                    if duplicate {
                        return Err(DomainError::Infrastructure(format!(
                            "unique constraint violated: ({session_id}, {kind}, {title})"
                        )));
                    }
                    inner.next_entry_id += 1;
                    let entry = Entry {
                        id: inner.next_entry_id,
                        session_id,
                        kind,
                        title,
                        content,
                        created_at: recorded_at,
                    };
                    let entry_id = entry.id;
                    inner.entries.push(entry);
                    (entry_id, ChangeOp::Create, None)
                }
                JournalAction::Update {
                    entry_id,
                    content,
                    previous_state,
                } => {
                    let entry = inner
                        .entries
                        .iter_mut()
                        .find(|e| e.id == entry_id)
                        .ok_or(DomainError::EntryNotFound(entry_id))?;
                    if let Some(content) = content {
                        entry.content = content;
                    }
                    (entry_id, ChangeOp::Update, Some(previous_state))
                }
                JournalAction::Delete {
                    entry_id,
                    previous_state,
                } => {
                    inner.entries.retain(|e| e.id != entry_id);
                    (entry_id, ChangeOp::Delete, Some(previous_state))
                }
            };

            inner.next_record_id += 1;
            let record = ChangeLogRecord {
                id: inner.next_record_id,
                session_id,
                message_id,
                entry_id,
                op,
                previous_state,
                created_at: recorded_at,
            };
            inner.records.push(record);
        }

        Ok(())
    }

    async fn records_for_messages(
        &self,
        session_id: Uuid,
        message_ids: &[i64],
    ) -> Result<Vec<ChangeLogRecord>, DomainError> {
        let inner = self.inner.lock().unwrap();
        let mut records: Vec<ChangeLogRecord> = inner
            .records
            .iter()
            .filter(|r| r.session_id == session_id && message_ids.contains(&r.message_id))
            .cloned()
            .collect();
        records.sort_by_key(|r| std::cmp::Reverse(r.id));
        Ok(records)
    }

    async fn apply_undo(&self, plan: UndoPlan) -> Result<(), DomainError> {
        let mut inner = self.inner.lock().unwrap();

        for step in plan.steps {
            match step {
                UndoStep::RemoveEntry(entry_id) => {
                    inner.entries.retain(|e| e.id != entry_id);
                }
                UndoStep::RestoreEntry(snapshot) => {
                    let entry = inner
                        .entries
                        .iter_mut()
                        .find(|e| e.id == snapshot.id)
                        .ok_or(DomainError::EntryNotFound(snapshot.id))?;
                    *entry = snapshot;
                }
                UndoStep::RecreateEntry(snapshot) => {
                    inner.entries.push(snapshot);
                }
            }
        }

        inner
            .records
            .retain(|r| !plan.record_ids.contains(&r.id));
        inner
            .messages
            .retain(|m| !plan.message_ids.contains(&m.id));

        Ok(())
    }
}
