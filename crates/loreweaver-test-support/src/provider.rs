//! Test providers — scripted and failing `NarrativeProvider` implementations.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use loreweaver_core::error::ProviderError;
use loreweaver_core::provider::{EditProposal, NarrativeProvider, WorldStateSnapshot};

/// Inputs of one recorded `narrate` call.
#[derive(Debug, Clone)]
pub struct NarrateCall {
    /// The player action.
    pub player_action: String,
    /// The assembled world-state text.
    pub world_state: String,
    /// The assembled conversation-history text.
    pub conversation_history: String,
    /// Requested language.
    pub language: String,
}

/// Inputs of one recorded `summarize` call.
#[derive(Debug, Clone)]
pub struct SummarizeCall {
    /// Rendered recent turns.
    pub recent_text: String,
    /// The previous summary handed in, if any.
    pub previous_summary: Option<String>,
}

/// A provider that replays scripted responses and records every call.
///
/// Scripted replies, proposals, and summaries are consumed front-to-back;
/// when a queue runs dry a deterministic default is produced so long
/// scenarios do not need exhaustive scripts.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
    proposals: Mutex<VecDeque<EditProposal>>,
    summaries: Mutex<VecDeque<String>>,
    narrate_calls: Mutex<Vec<NarrateCall>>,
    extract_calls: Mutex<Vec<WorldStateSnapshot>>,
    summarize_calls: Mutex<Vec<SummarizeCall>>,
}

impl ScriptedProvider {
    /// Create a provider with empty scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue narrative replies, consumed one per `narrate` call.
    #[must_use]
    pub fn with_replies<I, S>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.replies
            .lock()
            .unwrap()
            .extend(replies.into_iter().map(Into::into));
        self
    }

    /// Queue edit proposals, consumed one per `extract_edits` call.
    #[must_use]
    pub fn with_proposals<I>(self, proposals: I) -> Self
    where
        I: IntoIterator<Item = EditProposal>,
    {
        self.proposals.lock().unwrap().extend(proposals);
        self
    }

    /// Queue replacement summaries, consumed one per `summarize` call.
    #[must_use]
    pub fn with_summaries<I, S>(self, summaries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.summaries
            .lock()
            .unwrap()
            .extend(summaries.into_iter().map(Into::into));
        self
    }

    /// All recorded `narrate` calls.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn narrate_calls(&self) -> Vec<NarrateCall> {
        self.narrate_calls.lock().unwrap().clone()
    }

    /// The serialized state handed to each `extract_edits` call.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn extract_calls(&self) -> Vec<WorldStateSnapshot> {
        self.extract_calls.lock().unwrap().clone()
    }

    /// All recorded `summarize` calls.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn summarize_calls(&self) -> Vec<SummarizeCall> {
        self.summarize_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl NarrativeProvider for ScriptedProvider {
    async fn narrate(
        &self,
        player_action: &str,
        world_state: &str,
        conversation_history: &str,
        language: &str,
    ) -> Result<String, ProviderError> {
        self.narrate_calls.lock().unwrap().push(NarrateCall {
            player_action: player_action.to_owned(),
            world_state: world_state.to_owned(),
            conversation_history: conversation_history.to_owned(),
            language: language.to_owned(),
        });
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "The story continues.".to_owned()))
    }

    async fn extract_edits(
        &self,
        _user_input: &str,
        _assistant_output: &str,
        state: &WorldStateSnapshot,
        _language: &str,
    ) -> Result<EditProposal, ProviderError> {
        self.extract_calls.lock().unwrap().push(state.clone());
        Ok(self
            .proposals
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    async fn summarize(
        &self,
        recent_text: &str,
        previous_summary: Option<&str>,
        _language: &str,
    ) -> Result<String, ProviderError> {
        let mut calls = self.summarize_calls.lock().unwrap();
        calls.push(SummarizeCall {
            recent_text: recent_text.to_owned(),
            previous_summary: previous_summary.map(ToOwned::to_owned),
        });
        let ordinal = calls.len();
        drop(calls);
        Ok(self
            .summaries
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| format!("Consolidated summary {ordinal}")))
    }
}

/// A provider that always fails fast, for degraded-path tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingProvider;

#[async_trait]
impl NarrativeProvider for FailingProvider {
    async fn narrate(
        &self,
        _player_action: &str,
        _world_state: &str,
        _conversation_history: &str,
        _language: &str,
    ) -> Result<String, ProviderError> {
        Err(ProviderError::Unavailable("connection refused".into()))
    }

    async fn extract_edits(
        &self,
        _user_input: &str,
        _assistant_output: &str,
        _state: &WorldStateSnapshot,
        _language: &str,
    ) -> Result<EditProposal, ProviderError> {
        Err(ProviderError::Unavailable("connection refused".into()))
    }

    async fn summarize(
        &self,
        _recent_text: &str,
        _previous_summary: Option<&str>,
        _language: &str,
    ) -> Result<String, ProviderError> {
        Err(ProviderError::Unavailable("connection refused".into()))
    }
}
