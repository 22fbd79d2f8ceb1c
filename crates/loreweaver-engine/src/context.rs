//! Context assembly: a bounded, deterministic textual snapshot of world
//! state and recent conversation, consumable by the provider.
//!
//! Read-only over persisted state; never mutates sessions or messages.

use loreweaver_core::error::DomainError;
use loreweaver_core::model::{Entry, EntryKind, Session};
use loreweaver_core::store::GameStore;

/// Sentinel returned when a session has no summary and no entries, so the
/// provider always receives a well-formed placeholder.
pub const NO_WORLD_STATE: &str = "No world state yet.";

/// Sentinel returned when a session has no messages yet.
pub const START_OF_GAME: &str = "This is the start of the game.";

/// The assembled provider context for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledContext {
    /// Labeled world-state blocks, or [`NO_WORLD_STATE`].
    pub world_state: String,
    /// Recent messages oldest-first, or [`START_OF_GAME`].
    pub conversation_history: String,
}

/// Assembles the provider context for `session`: the world-state text from
/// the summary and all entries, and the most recent `history_window`
/// messages rendered oldest-first. Neither field is ever empty.
///
/// # Errors
///
/// Returns `DomainError` if the store fails.
pub async fn assemble(
    store: &dyn GameStore,
    session: &Session,
    history_window: usize,
) -> Result<AssembledContext, DomainError> {
    let entries = store.entries(session.id).await?;

    let mut blocks = Vec::new();
    if let Some(summary) = session.summary.as_deref()
        && !summary.is_empty()
    {
        blocks.push(format!("SUMMARY:\n{summary}"));
    }
    // Fixed block order: summary, characters, quests, lore.
    push_block(&mut blocks, "CHARACTERS:", &entries, EntryKind::Character);
    push_block(&mut blocks, "ACTIVE QUESTS:", &entries, EntryKind::Quest);
    push_block(&mut blocks, "WORLD LORE:", &entries, EntryKind::Lore);

    let world_state = if blocks.is_empty() {
        NO_WORLD_STATE.to_owned()
    } else {
        blocks.join("\n\n")
    };

    let limit = i64::try_from(history_window).unwrap_or(i64::MAX);
    let recent = store.recent_messages(session.id, 0, limit).await?;
    let conversation_history = if recent.is_empty() {
        START_OF_GAME.to_owned()
    } else {
        recent
            .iter()
            .map(|m| format!("{}: {}", m.role.as_str().to_uppercase(), m.content))
            .collect::<Vec<_>>()
            .join("\n")
    };

    Ok(AssembledContext {
        world_state,
        conversation_history,
    })
}

fn push_block(blocks: &mut Vec<String>, label: &str, entries: &[Entry], kind: EntryKind) {
    let lines: Vec<String> = entries
        .iter()
        .filter(|e| e.kind == kind)
        .map(|e| format!("- {}: {}", e.title, e.content))
        .collect();
    if !lines.is_empty() {
        blocks.push(format!("{label}\n{}", lines.join("\n")));
    }
}
