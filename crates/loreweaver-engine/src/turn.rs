//! Turn orchestration: drives one full turn and implements whole-turn undo.

use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use loreweaver_core::clock::Clock;
use loreweaver_core::error::DomainError;
use loreweaver_core::model::{ChangeOp, Entry, NewMessage, Role, Session};
use loreweaver_core::provider::NarrativeProvider;
use loreweaver_core::store::{GameStore, UndoPlan, UndoStep};

use crate::context;
use crate::journal::{self, TurnExchange};

/// Tunables for the turn engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// How many recent messages the assembled context window holds.
    pub history_window: usize,
    /// Compaction fires whenever the message count is an exact multiple of
    /// this threshold.
    pub summary_threshold: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_window: 10,
            summary_threshold: 10,
        }
    }
}

/// The per-session turn orchestrator.
///
/// Each turn runs strictly sequentially with no intermediate state exposed:
/// persist input, assemble context, invoke provider, persist output, apply
/// journal edits, check compaction. Callers must serialize access per
/// session; the engine holds no internal lock.
pub struct TurnEngine {
    store: Arc<dyn GameStore>,
    provider: Arc<dyn NarrativeProvider>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl TurnEngine {
    /// Creates a turn engine over the given collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn GameStore>,
        provider: Arc<dyn NarrativeProvider>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            provider,
            clock,
            config,
        }
    }

    /// Processes one player action through to its assistant reply.
    ///
    /// The user message is persisted before the provider is invoked, so a
    /// provider outage still leaves an audit trail of the attempted input;
    /// a narration failure degrades to an error-text reply that is persisted
    /// like any other assistant message.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotFound` if the session does not exist
    /// (checked before any side effect), or a store error.
    #[instrument(skip(self, action), fields(session_id = %session_id))]
    pub async fn process_action(
        &self,
        session_id: Uuid,
        action: &str,
        language: &str,
    ) -> Result<String, DomainError> {
        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or(DomainError::SessionNotFound(session_id))?;

        self.store
            .insert_message(NewMessage {
                session_id,
                role: Role::User,
                content: action.to_owned(),
                timestamp: self.clock.now(),
            })
            .await?;

        // Assembled after the user message is persisted: the window reflects
        // state before the assistant reply.
        let assembled =
            context::assemble(self.store.as_ref(), &session, self.config.history_window).await?;

        let reply = match self
            .provider
            .narrate(
                action,
                &assembled.world_state,
                &assembled.conversation_history,
                language,
            )
            .await
        {
            Ok(text) => text,
            Err(error) => {
                warn!(%error, "narration failed; persisting degraded reply");
                format!("Error: {error}")
            }
        };

        let assistant_message = self
            .store
            .insert_message(NewMessage {
                session_id,
                role: Role::Assistant,
                content: reply.clone(),
                timestamp: self.clock.now(),
            })
            .await?;

        journal::update_world_state(
            self.store.as_ref(),
            self.provider.as_ref(),
            self.clock.as_ref(),
            &session,
            TurnExchange {
                user_input: action,
                assistant_output: &reply,
                assistant_message_id: assistant_message.id,
                language,
            },
        )
        .await?;

        self.check_compaction(&session, language).await?;

        Ok(reply)
    }

    /// Compacts history into the running summary when the message count
    /// reaches an exact threshold multiple. The provider folds the previous
    /// summary and the most recent `threshold` messages into one replacement
    /// summary; on failure the prior summary is left untouched.
    async fn check_compaction(&self, session: &Session, language: &str) -> Result<(), DomainError> {
        let count = self.store.count_messages(session.id).await?;
        if count == 0 || count % self.config.summary_threshold != 0 {
            return Ok(());
        }

        let recent = self
            .store
            .recent_messages(session.id, 0, self.config.summary_threshold)
            .await?;
        let recent_text = recent
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");

        match self
            .provider
            .summarize(&recent_text, session.summary.as_deref(), language)
            .await
        {
            Ok(summary) => {
                info!(message_count = count, "replacing session summary");
                self.store.set_summary(session.id, &summary).await?;
            }
            Err(error) => {
                warn!(%error, "summarization failed; keeping prior summary");
            }
        }

        Ok(())
    }

    /// Undoes the most recent turn: the latest user message, every message
    /// at or after it, and all world-state changes journaled for those
    /// messages, replayed in strict reverse-creation order and applied
    /// atomically.
    ///
    /// Returns `Ok(false)` when there is no user message to undo.
    ///
    /// Known gap: a summary replacement from a compaction that coincided
    /// with the undone turn is not reversed; the change log covers entries
    /// and messages only.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotFound` if the session does not
    /// exist, or a store error; a corrupt change record (missing or
    /// undecodable prior state) surfaces as `Infrastructure`.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn undo(&self, session_id: Uuid) -> Result<bool, DomainError> {
        self.store
            .get_session(session_id)
            .await?
            .ok_or(DomainError::SessionNotFound(session_id))?;

        let Some(anchor) = self.store.last_user_message(session_id).await? else {
            info!("nothing to undo");
            return Ok(false);
        };

        let unit = self
            .store
            .messages_at_or_after(session_id, anchor.timestamp)
            .await?;
        let message_ids: Vec<i64> = unit.iter().map(|m| m.id).collect();

        let records = self
            .store
            .records_for_messages(session_id, &message_ids)
            .await?;

        let mut steps = Vec::with_capacity(records.len());
        let mut record_ids = Vec::with_capacity(records.len());
        for record in records {
            let step = match record.op {
                ChangeOp::Create => UndoStep::RemoveEntry(record.entry_id),
                ChangeOp::Update => UndoStep::RestoreEntry(decode_snapshot(&record, session_id)?),
                ChangeOp::Delete => UndoStep::RecreateEntry(decode_snapshot(&record, session_id)?),
            };
            steps.push(step);
            record_ids.push(record.id);
        }

        info!(
            messages = message_ids.len(),
            records = record_ids.len(),
            "undoing last turn"
        );
        self.store
            .apply_undo(UndoPlan {
                session_id,
                steps,
                record_ids,
                message_ids,
            })
            .await?;

        Ok(true)
    }
}

/// Decodes the prior-state snapshot of a change record back into an entry,
/// re-attaching the session identity.
fn decode_snapshot(
    record: &loreweaver_core::model::ChangeLogRecord,
    session_id: Uuid,
) -> Result<Entry, DomainError> {
    let snapshot = record.previous_state.clone().ok_or_else(|| {
        DomainError::Infrastructure(format!("change record {} has no prior state", record.id))
    })?;
    let mut entry: Entry = serde_json::from_value(snapshot).map_err(|e| {
        DomainError::Infrastructure(format!(
            "change record {} has undecodable prior state: {e}",
            record.id
        ))
    })?;
    entry.session_id = session_id;
    Ok(entry)
}
