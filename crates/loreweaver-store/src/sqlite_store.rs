//! SQLite implementation of the `GameStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::instrument;
use uuid::Uuid;

use loreweaver_core::error::DomainError;
use loreweaver_core::model::{
    ChangeLogRecord, ChangeOp, Entry, EntryKind, Message, NewMessage, Role, Session,
};
use loreweaver_core::store::{GameStore, JournalAction, UndoPlan, UndoStep};

use crate::schema;

/// SQLite-backed session store.
///
/// Timestamps are stored as fixed-width RFC 3339 text so lexicographic
/// comparison matches chronological order; uuids are stored as text.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Creates a store over an existing pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the tables and indexes if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the DDL fails.
    pub async fn migrate(&self) -> Result<(), DomainError> {
        sqlx::raw_sql(schema::CREATE_TABLES)
            .execute(&self.pool)
            .await
            .map_err(infra)?;
        Ok(())
    }
}

fn infra<E: std::fmt::Display>(error: E) -> DomainError {
    DomainError::Infrastructure(error.to_string())
}

fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_ts(raw: &str) -> Result<DateTime<Utc>, DomainError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(infra)
}

fn decode_uuid(raw: &str) -> Result<Uuid, DomainError> {
    Uuid::parse_str(raw).map_err(infra)
}

fn session_from_row(row: &SqliteRow) -> Result<Session, DomainError> {
    Ok(Session {
        id: decode_uuid(&row.try_get::<String, _>("id").map_err(infra)?)?,
        name: row.try_get("name").map_err(infra)?,
        start_prompt: row.try_get("start_prompt").map_err(infra)?,
        summary: row.try_get("summary").map_err(infra)?,
        created_at: decode_ts(&row.try_get::<String, _>("created_at").map_err(infra)?)?,
    })
}

fn message_from_row(row: &SqliteRow) -> Result<Message, DomainError> {
    Ok(Message {
        id: row.try_get("id").map_err(infra)?,
        session_id: decode_uuid(&row.try_get::<String, _>("session_id").map_err(infra)?)?,
        role: row.try_get::<String, _>("role").map_err(infra)?.parse()?,
        content: row.try_get("content").map_err(infra)?,
        timestamp: decode_ts(&row.try_get::<String, _>("timestamp").map_err(infra)?)?,
    })
}

fn entry_from_row(row: &SqliteRow) -> Result<Entry, DomainError> {
    Ok(Entry {
        id: row.try_get("id").map_err(infra)?,
        session_id: decode_uuid(&row.try_get::<String, _>("session_id").map_err(infra)?)?,
        kind: row.try_get::<String, _>("kind").map_err(infra)?.parse()?,
        title: row.try_get("title").map_err(infra)?,
        content: row.try_get("content").map_err(infra)?,
        created_at: decode_ts(&row.try_get::<String, _>("created_at").map_err(infra)?)?,
    })
}

fn record_from_row(row: &SqliteRow) -> Result<ChangeLogRecord, DomainError> {
    let previous_state = row
        .try_get::<Option<String>, _>("previous_state")
        .map_err(infra)?
        .map(|raw| serde_json::from_str(&raw).map_err(infra))
        .transpose()?;
    Ok(ChangeLogRecord {
        id: row.try_get("id").map_err(infra)?,
        session_id: decode_uuid(&row.try_get::<String, _>("session_id").map_err(infra)?)?,
        message_id: row.try_get("message_id").map_err(infra)?,
        entry_id: row.try_get("entry_id").map_err(infra)?,
        op: row.try_get::<String, _>("op").map_err(infra)?.parse()?,
        previous_state,
        created_at: decode_ts(&row.try_get::<String, _>("created_at").map_err(infra)?)?,
    })
}

#[async_trait]
impl GameStore for SqliteStore {
    async fn create_session(&self, session: &Session) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO sessions (id, name, start_prompt, summary, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(session.id.to_string())
        .bind(&session.name)
        .bind(&session.start_prompt)
        .bind(session.summary.as_deref())
        .bind(encode_ts(session.created_at))
        .execute(&self.pool)
        .await
        .map_err(infra)?;
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, DomainError> {
        let row = sqlx::query("SELECT * FROM sessions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?;
        row.as_ref().map(session_from_row).transpose()
    }

    async fn list_sessions(&self, offset: i64, limit: i64) -> Result<Vec<Session>, DomainError> {
        let rows = sqlx::query(
            "SELECT * FROM sessions ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)?;
        rows.iter().map(session_from_row).collect()
    }

    #[instrument(skip(self), fields(session_id = %id))]
    async fn delete_session(&self, id: Uuid) -> Result<(), DomainError> {
        let id = id.to_string();
        let mut tx = self.pool.begin().await.map_err(infra)?;
        sqlx::query("DELETE FROM change_log WHERE session_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(infra)?;
        sqlx::query("DELETE FROM entries WHERE session_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(infra)?;
        sqlx::query("DELETE FROM messages WHERE session_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(infra)?;
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(infra)?;
        tx.commit().await.map_err(infra)
    }

    async fn set_summary(&self, id: Uuid, summary: &str) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE sessions SET summary = ? WHERE id = ?")
            .bind(summary)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(infra)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::SessionNotFound(id));
        }
        Ok(())
    }

    async fn insert_message(&self, message: NewMessage) -> Result<Message, DomainError> {
        let result = sqlx::query(
            "INSERT INTO messages (session_id, role, content, timestamp)
             VALUES (?, ?, ?, ?)",
        )
        .bind(message.session_id.to_string())
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(encode_ts(message.timestamp))
        .execute(&self.pool)
        .await
        .map_err(infra)?;

        Ok(Message {
            id: result.last_insert_rowid(),
            session_id: message.session_id,
            role: message.role,
            content: message.content,
            timestamp: message.timestamp,
        })
    }

    async fn recent_messages(
        &self,
        session_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Message>, DomainError> {
        let rows = sqlx::query(
            "SELECT * FROM messages WHERE session_id = ?
             ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(session_id.to_string())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)?;
        let mut messages: Vec<Message> = rows
            .iter()
            .map(message_from_row)
            .collect::<Result<_, _>>()?;
        messages.reverse();
        Ok(messages)
    }

    async fn count_messages(&self, session_id: Uuid) -> Result<i64, DomainError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM messages WHERE session_id = ?")
            .bind(session_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(infra)?;
        row.try_get("count").map_err(infra)
    }

    async fn last_user_message(&self, session_id: Uuid) -> Result<Option<Message>, DomainError> {
        let row = sqlx::query(
            "SELECT * FROM messages WHERE session_id = ? AND role = 'user'
             ORDER BY timestamp DESC, id DESC LIMIT 1",
        )
        .bind(session_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?;
        row.as_ref().map(message_from_row).transpose()
    }

    async fn messages_at_or_after(
        &self,
        session_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Message>, DomainError> {
        let rows = sqlx::query(
            "SELECT * FROM messages WHERE session_id = ? AND timestamp >= ?
             ORDER BY timestamp ASC, id ASC",
        )
        .bind(session_id.to_string())
        .bind(encode_ts(since))
        .fetch_all(&self.pool)
        .await
        .map_err(infra)?;
        rows.iter().map(message_from_row).collect()
    }

    async fn entries(&self, session_id: Uuid) -> Result<Vec<Entry>, DomainError> {
        let rows = sqlx::query("SELECT * FROM entries WHERE session_id = ? ORDER BY id ASC")
            .bind(session_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(infra)?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn find_entry(
        &self,
        session_id: Uuid,
        kind: EntryKind,
        title: &str,
    ) -> Result<Option<Entry>, DomainError> {
        let row = sqlx::query("SELECT * FROM entries WHERE session_id = ? AND kind = ? AND title = ?")
            .bind(session_id.to_string())
            .bind(kind.as_str())
            .bind(title)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?;
        row.as_ref().map(entry_from_row).transpose()
    }

    #[instrument(skip(self, actions), fields(session_id = %session_id, count = actions.len()))]
    async fn apply_journal_batch(
        &self,
        session_id: Uuid,
        message_id: i64,
        recorded_at: DateTime<Utc>,
        actions: Vec<JournalAction>,
    ) -> Result<(), DomainError> {
        let session = session_id.to_string();
        let recorded = encode_ts(recorded_at);
        let mut tx = self.pool.begin().await.map_err(infra)?;

        for action in actions {
            let (entry_id, op, previous_state) = match action {
                JournalAction::Create {
                    kind,
                    title,
                    content,
                } => {
                    let result = sqlx::query(
                        "INSERT INTO entries (session_id, kind, title, content, created_at)
                         VALUES (?, ?, ?, ?, ?)",
                    )
                    .bind(&session)
                    .bind(kind.as_str())
                    .bind(&title)
                    .bind(&content)
                    .bind(&recorded)
                    .execute(&mut *tx)
                    .await
                    .map_err(infra)?;
                    (result.last_insert_rowid(), ChangeOp::Create, None)
                }
                JournalAction::Update {
                    entry_id,
                    content,
                    previous_state,
                } => {
                    if let Some(content) = content {
                        let result = sqlx::query("UPDATE entries SET content = ? WHERE id = ?")
                            .bind(&content)
                            .bind(entry_id)
                            .execute(&mut *tx)
                            .await
                            .map_err(infra)?;
                        if result.rows_affected() == 0 {
                            return Err(DomainError::EntryNotFound(entry_id));
                        }
                    }
                    (entry_id, ChangeOp::Update, Some(previous_state))
                }
                JournalAction::Delete {
                    entry_id,
                    previous_state,
                } => {
                    sqlx::query("DELETE FROM entries WHERE id = ?")
                        .bind(entry_id)
                        .execute(&mut *tx)
                        .await
                        .map_err(infra)?;
                    (entry_id, ChangeOp::Delete, Some(previous_state))
                }
            };

            sqlx::query(
                "INSERT INTO change_log (session_id, message_id, entry_id, op, previous_state, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&session)
            .bind(message_id)
            .bind(entry_id)
            .bind(op.as_str())
            .bind(previous_state.map(|v| v.to_string()))
            .bind(&recorded)
            .execute(&mut *tx)
            .await
            .map_err(infra)?;
        }

        tx.commit().await.map_err(infra)
    }

    async fn records_for_messages(
        &self,
        session_id: Uuid,
        message_ids: &[i64],
    ) -> Result<Vec<ChangeLogRecord>, DomainError> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; message_ids.len()].join(", ");
        let sql = format!(
            "SELECT * FROM change_log WHERE session_id = ? AND message_id IN ({placeholders})
             ORDER BY id DESC"
        );
        let mut query = sqlx::query(&sql).bind(session_id.to_string());
        for id in message_ids {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(infra)?;
        rows.iter().map(record_from_row).collect()
    }

    #[instrument(skip(self, plan), fields(session_id = %plan.session_id, steps = plan.steps.len()))]
    async fn apply_undo(&self, plan: UndoPlan) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(infra)?;

        for step in plan.steps {
            match step {
                UndoStep::RemoveEntry(entry_id) => {
                    sqlx::query("DELETE FROM entries WHERE id = ?")
                        .bind(entry_id)
                        .execute(&mut *tx)
                        .await
                        .map_err(infra)?;
                }
                UndoStep::RestoreEntry(entry) => {
                    let result = sqlx::query(
                        "UPDATE entries SET kind = ?, title = ?, content = ?, created_at = ?
                         WHERE id = ?",
                    )
                    .bind(entry.kind.as_str())
                    .bind(&entry.title)
                    .bind(&entry.content)
                    .bind(encode_ts(entry.created_at))
                    .bind(entry.id)
                    .execute(&mut *tx)
                    .await
                    .map_err(infra)?;
                    if result.rows_affected() == 0 {
                        return Err(DomainError::EntryNotFound(entry.id));
                    }
                }
                UndoStep::RecreateEntry(entry) => {
                    sqlx::query(
                        "INSERT INTO entries (id, session_id, kind, title, content, created_at)
                         VALUES (?, ?, ?, ?, ?, ?)",
                    )
                    .bind(entry.id)
                    .bind(entry.session_id.to_string())
                    .bind(entry.kind.as_str())
                    .bind(&entry.title)
                    .bind(&entry.content)
                    .bind(encode_ts(entry.created_at))
                    .execute(&mut *tx)
                    .await
                    .map_err(infra)?;
                }
            }
        }

        for record_id in plan.record_ids {
            sqlx::query("DELETE FROM change_log WHERE id = ?")
                .bind(record_id)
                .execute(&mut *tx)
                .await
                .map_err(infra)?;
        }
        for message_id in plan.message_ids {
            sqlx::query("DELETE FROM messages WHERE id = ?")
                .bind(message_id)
                .execute(&mut *tx)
                .await
                .map_err(infra)?;
        }

        tx.commit().await.map_err(infra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    fn test_session() -> Session {
        Session {
            id: Uuid::new_v4(),
            name: "Test".to_owned(),
            start_prompt: "A dark tavern".to_owned(),
            summary: None,
            created_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        }
    }

    fn ts(second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, second).unwrap()
    }

    async fn insert(store: &SqliteStore, session: &Session, role: Role, second: u32) -> Message {
        store
            .insert_message(NewMessage {
                session_id: session.id,
                role,
                content: format!("message at {second}"),
                timestamp: ts(second),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_session_round_trip_and_summary_replacement() {
        // Arrange
        let store = test_store().await;
        let session = test_session();

        // Act
        store.create_session(&session).await.unwrap();
        store.set_summary(session.id, "so far").await.unwrap();

        // Assert
        let loaded = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, session.name);
        assert_eq!(loaded.created_at, session.created_at);
        assert_eq!(loaded.summary.as_deref(), Some("so far"));
    }

    #[tokio::test]
    async fn test_set_summary_on_unknown_session_is_not_found() {
        let store = test_store().await;

        let result = store.set_summary(Uuid::new_v4(), "lost").await;

        assert!(matches!(result, Err(DomainError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_recent_messages_returns_newest_window_oldest_first() {
        // Arrange
        let store = test_store().await;
        let session = test_session();
        store.create_session(&session).await.unwrap();
        for second in 0..5 {
            insert(&store, &session, Role::User, second).await;
        }

        // Act
        let window = store.recent_messages(session.id, 0, 2).await.unwrap();

        // Assert
        let contents: Vec<&str> = window.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["message at 3", "message at 4"]);
    }

    #[tokio::test]
    async fn test_last_user_message_skips_assistant_messages() {
        // Arrange
        let store = test_store().await;
        let session = test_session();
        store.create_session(&session).await.unwrap();
        insert(&store, &session, Role::User, 0).await;
        let last_user = insert(&store, &session, Role::User, 1).await;
        insert(&store, &session, Role::Assistant, 2).await;

        // Act
        let found = store.last_user_message(session.id).await.unwrap().unwrap();

        // Assert
        assert_eq!(found.id, last_user.id);

        let unit = store
            .messages_at_or_after(session.id, found.timestamp)
            .await
            .unwrap();
        assert_eq!(unit.len(), 2);
    }

    #[tokio::test]
    async fn test_journal_batch_is_atomic_on_unique_violation() {
        // Arrange
        let store = test_store().await;
        let session = test_session();
        store.create_session(&session).await.unwrap();
        let message = insert(&store, &session, Role::Assistant, 0).await;

        let create = |content: &str| JournalAction::Create {
            kind: EntryKind::Quest,
            title: "Find Ring".to_owned(),
            content: content.to_owned(),
        };

        store
            .apply_journal_batch(session.id, message.id, ts(1), vec![create("first")])
            .await
            .unwrap();

        // Act — second batch violates (session, kind, title) uniqueness; the
        // batch also carries an unrelated create that must roll back with it.
        let result = store
            .apply_journal_batch(
                session.id,
                message.id,
                ts(2),
                vec![
                    JournalAction::Create {
                        kind: EntryKind::Lore,
                        title: "Moon Gate".to_owned(),
                        content: "sealed".to_owned(),
                    },
                    create("duplicate"),
                ],
            )
            .await;

        // Assert
        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
        let entries = store.entries(session.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content, "first");
        let records = store
            .records_for_messages(session.id, &[message.id])
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_records_come_back_in_reverse_creation_order() {
        // Arrange
        let store = test_store().await;
        let session = test_session();
        store.create_session(&session).await.unwrap();
        let message = insert(&store, &session, Role::Assistant, 0).await;

        store
            .apply_journal_batch(
                session.id,
                message.id,
                ts(1),
                vec![
                    JournalAction::Create {
                        kind: EntryKind::Quest,
                        title: "Find Ring".to_owned(),
                        content: "lost".to_owned(),
                    },
                    JournalAction::Create {
                        kind: EntryKind::Character,
                        title: "Bob".to_owned(),
                        content: "friendly".to_owned(),
                    },
                ],
            )
            .await
            .unwrap();

        // Act
        let records = store
            .records_for_messages(session.id, &[message.id])
            .await
            .unwrap();

        // Assert
        assert_eq!(records.len(), 2);
        assert!(records[0].id > records[1].id);
    }

    #[tokio::test]
    async fn test_apply_undo_recreates_restores_and_removes() {
        // Arrange
        let store = test_store().await;
        let session = test_session();
        store.create_session(&session).await.unwrap();
        let user = insert(&store, &session, Role::User, 0).await;
        let assistant = insert(&store, &session, Role::Assistant, 1).await;

        store
            .apply_journal_batch(
                session.id,
                assistant.id,
                ts(2),
                vec![JournalAction::Create {
                    kind: EntryKind::Quest,
                    title: "Find Ring".to_owned(),
                    content: "lost".to_owned(),
                }],
            )
            .await
            .unwrap();
        let created = store.entries(session.id).await.unwrap().remove(0);
        let records = store
            .records_for_messages(session.id, &[assistant.id])
            .await
            .unwrap();

        // Act
        store
            .apply_undo(UndoPlan {
                session_id: session.id,
                steps: vec![UndoStep::RemoveEntry(created.id)],
                record_ids: records.iter().map(|r| r.id).collect(),
                message_ids: vec![user.id, assistant.id],
            })
            .await
            .unwrap();

        // Assert
        assert!(store.entries(session.id).await.unwrap().is_empty());
        assert_eq!(store.count_messages(session.id).await.unwrap(), 0);
        assert!(
            store
                .records_for_messages(session.id, &[assistant.id])
                .await
                .unwrap()
                .is_empty()
        );

        // Recreating from the snapshot restores the original id.
        store
            .apply_undo(UndoPlan {
                session_id: session.id,
                steps: vec![UndoStep::RecreateEntry(created.clone())],
                record_ids: vec![],
                message_ids: vec![],
            })
            .await
            .unwrap();
        let entries = store.entries(session.id).await.unwrap();
        assert_eq!(entries, vec![created]);
    }

    #[tokio::test]
    async fn test_delete_session_removes_everything_it_owns() {
        // Arrange
        let store = test_store().await;
        let session = test_session();
        store.create_session(&session).await.unwrap();
        let assistant = insert(&store, &session, Role::Assistant, 0).await;
        store
            .apply_journal_batch(
                session.id,
                assistant.id,
                ts(1),
                vec![JournalAction::Create {
                    kind: EntryKind::Lore,
                    title: "Moon Gate".to_owned(),
                    content: "sealed".to_owned(),
                }],
            )
            .await
            .unwrap();

        // Act
        store.delete_session(session.id).await.unwrap();

        // Assert
        assert!(store.get_session(session.id).await.unwrap().is_none());
        assert_eq!(store.count_messages(session.id).await.unwrap(), 0);
        assert!(store.entries(session.id).await.unwrap().is_empty());
    }
}
