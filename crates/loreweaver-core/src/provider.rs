//! Generative text provider abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// A world fact serialized for the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedFact {
    /// Entry title.
    pub name: String,
    /// Entry content.
    pub description: String,
}

/// Current world state in the shape the provider understands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldStateSnapshot {
    /// Running summary, empty string if none.
    pub summary: String,
    /// Quest entries.
    pub quests: Vec<NamedFact>,
    /// Lore entries.
    pub lore: Vec<NamedFact>,
    /// Character entries.
    pub characters: Vec<NamedFact>,
}

/// One proposed edit from the provider.
///
/// Deliberately loose: the provider is an unreliable oracle over free text,
/// so every field is optional, `name`/`description` accept the `key`/`value`
/// spellings, and unknown fields are ignored. A missing operation defaults
/// to add; the journal manager reconciles mislabeled operations afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedEdit {
    /// Claimed operation: add, update, or delete. May be wrong.
    #[serde(default)]
    pub operation: Option<String>,
    /// Entry title the edit targets.
    #[serde(default, alias = "key")]
    pub name: Option<String>,
    /// Replacement or initial content.
    #[serde(default, alias = "value")]
    pub description: Option<String>,
}

/// A structured edit proposal extracted from one turn. Missing categories
/// deserialize as empty, so a partial or entirely malformed payload degrades
/// to "no changes" rather than a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditProposal {
    /// Proposed quest edits.
    #[serde(default)]
    pub quests: Vec<ProposedEdit>,
    /// Proposed lore edits.
    #[serde(default)]
    pub lore: Vec<ProposedEdit>,
    /// Proposed character edits.
    #[serde(default)]
    pub characters: Vec<ProposedEdit>,
}

impl EditProposal {
    /// Returns true when no category proposes any edit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quests.is_empty() && self.lore.is_empty() && self.characters.is_empty()
    }
}

/// The external generative text service, treated as a black box.
///
/// The provider call is the only operation expected to block for
/// non-trivial wall-clock time; it either returns text or fails fast.
/// Cancellation and timeouts are the implementation's concern.
#[async_trait]
pub trait NarrativeProvider: Send + Sync {
    /// Produce the next narrative reply to a player action.
    async fn narrate(
        &self,
        player_action: &str,
        world_state: &str,
        conversation_history: &str,
        language: &str,
    ) -> Result<String, ProviderError>;

    /// Extract structured world-state edits from the last exchange.
    ///
    /// Best-effort: implementations should map malformed output to an empty
    /// proposal where they can, and callers must treat `Err` as empty.
    async fn extract_edits(
        &self,
        user_input: &str,
        assistant_output: &str,
        state: &WorldStateSnapshot,
        language: &str,
    ) -> Result<EditProposal, ProviderError>;

    /// Fold the previous summary and recent turns into one replacement
    /// summary.
    async fn summarize(
        &self,
        recent_text: &str,
        previous_summary: Option<&str>,
        language: &str,
    ) -> Result<String, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proposal_with_missing_categories_deserializes_empty() {
        let proposal: EditProposal = serde_json::from_str("{}").unwrap();
        assert!(proposal.is_empty());
    }

    #[test]
    fn test_proposed_edit_accepts_key_value_spelling() {
        let json = r#"{"quests":[{"operation":"add","key":"Find Ring","value":"Return it"}]}"#;
        let proposal: EditProposal = serde_json::from_str(json).unwrap();

        assert_eq!(proposal.quests.len(), 1);
        assert_eq!(proposal.quests[0].name.as_deref(), Some("Find Ring"));
        assert_eq!(proposal.quests[0].description.as_deref(), Some("Return it"));
    }

    #[test]
    fn test_proposal_ignores_alien_fields() {
        let json = r#"{"quests":[{"name":"X","confidence":0.9}],"mood":"tense"}"#;
        let proposal: EditProposal = serde_json::from_str(json).unwrap();

        assert_eq!(proposal.quests.len(), 1);
        assert_eq!(proposal.quests[0].operation, None);
    }
}
