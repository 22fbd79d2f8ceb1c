//! Journal management: reconciling provider-proposed edits against current
//! entries and persisting the net effect with enough information to reverse
//! it.
//!
//! The provider is an unreliable oracle over free text, so reconciliation is
//! forgiving of operation-label mismatches but strict on identity matching
//! (exact title equality within a kind); a false merge would silently
//! corrupt world state.

use std::collections::HashMap;

use tracing::{debug, warn};

use loreweaver_core::clock::Clock;
use loreweaver_core::error::DomainError;
use loreweaver_core::model::{Entry, EntryKind, Session};
use loreweaver_core::provider::{
    EditProposal, NamedFact, NarrativeProvider, ProposedEdit, WorldStateSnapshot,
};
use loreweaver_core::store::{GameStore, JournalAction};

/// The turn exchange being journaled.
#[derive(Debug, Clone, Copy)]
pub struct TurnExchange<'a> {
    /// The player's input for this turn.
    pub user_input: &'a str,
    /// The assistant reply for this turn.
    pub assistant_output: &'a str,
    /// The persisted assistant message; change-log records reference it.
    pub assistant_message_id: i64,
    /// Requested language.
    pub language: &'a str,
}

/// Extracts world-state edits for one turn and commits the reconciled net
/// effect, with change-log records, as a single atomic batch.
///
/// Extraction is best-effort: a provider failure or malformed proposal
/// degrades to "no changes" and never fails the turn.
///
/// # Errors
///
/// Returns `DomainError` if the store fails.
pub async fn update_world_state(
    store: &dyn GameStore,
    provider: &dyn NarrativeProvider,
    clock: &dyn Clock,
    session: &Session,
    exchange: TurnExchange<'_>,
) -> Result<(), DomainError> {
    let entries = store.entries(session.id).await?;
    let snapshot = serialize_state(session, &entries);

    let proposal = match provider
        .extract_edits(
            exchange.user_input,
            exchange.assistant_output,
            &snapshot,
            exchange.language,
        )
        .await
    {
        Ok(proposal) => proposal,
        Err(error) => {
            warn!(%error, "edit extraction failed; turn proceeds without world-state changes");
            EditProposal::default()
        }
    };
    if proposal.is_empty() {
        return Ok(());
    }

    let actions = reconcile(&entries, &proposal)?;
    if actions.is_empty() {
        return Ok(());
    }

    debug!(count = actions.len(), "applying journal batch");
    store
        .apply_journal_batch(
            session.id,
            exchange.assistant_message_id,
            clock.now(),
            actions,
        )
        .await
}

/// Serializes current entries into the shape the provider understands.
#[must_use]
pub fn serialize_state(session: &Session, entries: &[Entry]) -> WorldStateSnapshot {
    let facts = |kind: EntryKind| -> Vec<NamedFact> {
        entries
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| NamedFact {
                name: e.title.clone(),
                description: e.content.clone(),
            })
            .collect()
    };

    WorldStateSnapshot {
        summary: session.summary.clone().unwrap_or_default(),
        quests: facts(EntryKind::Quest),
        lore: facts(EntryKind::Lore),
        characters: facts(EntryKind::Character),
    }
}

/// The operation a proposal claims, before reconciliation. Unknown or
/// missing labels land on `Add` and are then subject to the add↔update
/// coercion, so a mislabeled operation can never duplicate a title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Add,
    Update,
    Delete,
}

fn proposed_intent(raw: Option<&str>) -> Intent {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("update") => Intent::Update,
        Some("delete" | "remove") => Intent::Delete,
        _ => Intent::Add,
    }
}

/// Where an identity currently lives while a batch is being reconciled:
/// a persisted entry, or a create action earlier in this same batch.
#[derive(Debug)]
enum Slot {
    Existing(Entry),
    Pending(usize),
}

/// Reconciles a proposal against current entries, producing the net batch
/// of journal actions.
///
/// Reconciliation policy: add of an existing title becomes update; update
/// of a missing title becomes add; delete of a missing title is a no-op.
/// Edits without a name are skipped. Later edits in the same batch see the
/// effects of earlier ones, so (kind, title) uniqueness holds for the batch
/// as a whole.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if a prior-state snapshot cannot
/// be serialized.
pub fn reconcile(
    entries: &[Entry],
    proposal: &EditProposal,
) -> Result<Vec<JournalAction>, DomainError> {
    let mut view: HashMap<(EntryKind, String), Slot> = entries
        .iter()
        .map(|e| ((e.kind, e.title.clone()), Slot::Existing(e.clone())))
        .collect();
    let mut actions: Vec<Option<JournalAction>> = Vec::new();

    let batches = [
        (EntryKind::Quest, &proposal.quests),
        (EntryKind::Lore, &proposal.lore),
        (EntryKind::Character, &proposal.characters),
    ];
    for (kind, edits) in batches {
        for edit in edits {
            apply_edit(kind, edit, &mut view, &mut actions)?;
        }
    }

    Ok(actions.into_iter().flatten().collect())
}

fn apply_edit(
    kind: EntryKind,
    edit: &ProposedEdit,
    view: &mut HashMap<(EntryKind, String), Slot>,
    actions: &mut Vec<Option<JournalAction>>,
) -> Result<(), DomainError> {
    let Some(name) = edit
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
    else {
        debug!(%kind, "skipping proposed edit without a name");
        return Ok(());
    };
    let description = edit.description.clone().filter(|d| !d.is_empty());

    let key = (kind, name.to_owned());
    let intent = proposed_intent(edit.operation.as_deref());
    let exists = view.contains_key(&key);

    let effective = match (intent, exists) {
        (Intent::Add, true) => Intent::Update,
        (Intent::Update, false) => Intent::Add,
        (Intent::Delete, false) => {
            debug!(%kind, title = name, "delete of unknown entry skipped");
            return Ok(());
        }
        (intent, _) => intent,
    };

    match effective {
        Intent::Add => {
            let index = actions.len();
            actions.push(Some(JournalAction::Create {
                kind,
                title: name.to_owned(),
                content: description.unwrap_or_default(),
            }));
            view.insert(key, Slot::Pending(index));
        }
        Intent::Update => match view.get_mut(&key) {
            Some(Slot::Existing(entry)) => {
                let previous_state = snapshot_of(entry)?;
                actions.push(Some(JournalAction::Update {
                    entry_id: entry.id,
                    content: description.clone(),
                    previous_state,
                }));
                if let Some(description) = description {
                    entry.content = description;
                }
            }
            Some(Slot::Pending(index)) => {
                // Fold into the earlier create from this same batch.
                if let (Some(Some(JournalAction::Create { content, .. })), Some(description)) =
                    (actions.get_mut(*index), description)
                {
                    *content = description;
                }
            }
            None => unreachable!("update intent requires a resolved slot"),
        },
        Intent::Delete => match view.remove(&key) {
            Some(Slot::Existing(entry)) => {
                let previous_state = snapshot_of(&entry)?;
                actions.push(Some(JournalAction::Delete {
                    entry_id: entry.id,
                    previous_state,
                }));
            }
            Some(Slot::Pending(index)) => {
                // Create and delete within one batch cancel out.
                actions[index] = None;
            }
            None => unreachable!("delete intent requires a resolved slot"),
        },
    }

    Ok(())
}

fn snapshot_of(entry: &Entry) -> Result<serde_json::Value, DomainError> {
    serde_json::to_value(entry)
        .map_err(|e| DomainError::Infrastructure(format!("snapshot serialization failed: {e}")))
}
