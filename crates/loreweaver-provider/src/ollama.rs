//! Ollama HTTP client implementing `NarrativeProvider`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use loreweaver_core::error::ProviderError;
use loreweaver_core::provider::{EditProposal, NarrativeProvider, WorldStateSnapshot};

use crate::prompts::{self, Purpose};

/// Generative text provider backed by a local Ollama instance.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaProvider {
    /// Creates a provider for `model` served at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// One call to the Ollama generate API. `json_format` asks the model to
    /// constrain its output to a JSON object.
    async fn generate(
        &self,
        prompt: &str,
        system: &str,
        json_format: bool,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            system,
            stream: false,
            format: json_format.then_some("json"),
        };

        debug!(url, model = self.model, "calling provider");
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        Ok(body.response)
    }
}

/// Parses extractor output, degrading malformed JSON to an empty proposal.
fn parse_proposal(raw: &str) -> EditProposal {
    match serde_json::from_str(raw) {
        Ok(proposal) => proposal,
        Err(error) => {
            warn!(%error, "extractor output was not valid JSON; treating as empty");
            EditProposal::default()
        }
    }
}

#[async_trait]
impl NarrativeProvider for OllamaProvider {
    async fn narrate(
        &self,
        player_action: &str,
        world_state: &str,
        conversation_history: &str,
        language: &str,
    ) -> Result<String, ProviderError> {
        let system = prompts::system_prompt(Purpose::GameMaster, language);
        let prompt = format!(
            "<world_state>\n{world_state}\n</world_state>\n\n\
             <conversation_history>\n{conversation_history}\n</conversation_history>\n\n\
             <player_action>\n{player_action}\n</player_action>"
        );
        self.generate(&prompt, system, false).await
    }

    async fn extract_edits(
        &self,
        user_input: &str,
        assistant_output: &str,
        state: &WorldStateSnapshot,
        language: &str,
    ) -> Result<EditProposal, ProviderError> {
        let existing_state = serde_json::to_string_pretty(state)
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let prompt = prompts::render_extractor_prompt(
            language,
            &existing_state,
            user_input,
            assistant_output,
        );

        let raw = self.generate(&prompt, "", true).await?;
        Ok(parse_proposal(&raw))
    }

    async fn summarize(
        &self,
        recent_text: &str,
        previous_summary: Option<&str>,
        language: &str,
    ) -> Result<String, ProviderError> {
        let system = prompts::system_prompt(Purpose::Summarizer, language);
        let prompt = match previous_summary {
            Some(previous) => format!(
                "<previous_summary>\n{previous}\n</previous_summary>\n\n\
                 <recent_events>\n{recent_text}\n</recent_events>"
            ),
            None => recent_text.to_owned(),
        };
        self.generate(&prompt, system, false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_extractor_output_degrades_to_empty_proposal() {
        let proposal = parse_proposal("The hero found a ring, so I would add a quest.");
        assert!(proposal.is_empty());
    }

    #[test]
    fn test_partial_extractor_output_parses_what_it_can() {
        let proposal = parse_proposal(r#"{"quests":[{"name":"Find Ring"}]}"#);

        assert_eq!(proposal.quests.len(), 1);
        assert!(proposal.lore.is_empty());
        assert!(proposal.characters.is_empty());
    }

    #[test]
    fn test_generate_request_omits_format_unless_json() {
        let request = GenerateRequest {
            model: "llama3",
            prompt: "p",
            system: "s",
            stream: false,
            format: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("format").is_none());
    }
}
