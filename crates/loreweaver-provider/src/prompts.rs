//! System prompt catalog, keyed by purpose and language.
//!
//! Lookup falls back to English for any language without a localized
//! variant, so an unknown language tag degrades rather than fails.

/// What the provider is being asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    /// Narrate the next turn as game master.
    GameMaster,
    /// Fold history into a replacement summary.
    Summarizer,
    /// Extract structured journal edits from the last exchange.
    JournalExtractor,
}

const GAME_MASTER_EN: &str = "\
You are the game master of a turn-based interactive story. Use the world \
state and the conversation history as established canon. Narrate the \
consequence of the player's action in vivid second-person prose, two to \
four paragraphs, and end at a point where the player can act again. Never \
speak for the player and never break character.";

const SUMMARIZER_EN: &str = "\
You condense the events of an interactive story. Fold the previous summary \
and the recent events into one consolidated narrative summary in plain \
prose. Keep every fact a future game master would need: names, places, \
promises, open threads. Output only the new summary.";

const JOURNAL_EXTRACTOR_EN: &str = "\
You maintain the journal of an interactive story. Given the current world \
state, the player's request, and the game master's response, extract the \
net changes to quests, lore, and characters. Respond with only a JSON \
object of the shape {\"quests\": [], \"lore\": [], \"characters\": []}, \
where each item is {\"operation\": \"add\"|\"update\"|\"delete\", \
\"name\": string, \"description\": string}. Only include real changes; \
respond with empty lists when nothing changed.

Current world state:
{existing_state}

Player request:
{user_request}

Game master response:
{game_master_response}";

/// Returns the system prompt for `purpose` in `language`, falling back to
/// English.
#[must_use]
pub fn system_prompt(purpose: Purpose, language: &str) -> &'static str {
    // Only English is shipped today; the match keys on language so
    // localized variants slot in without touching call sites.
    match (purpose, language) {
        (Purpose::GameMaster, _) => GAME_MASTER_EN,
        (Purpose::Summarizer, _) => SUMMARIZER_EN,
        (Purpose::JournalExtractor, _) => JOURNAL_EXTRACTOR_EN,
    }
}

/// Renders the journal-extractor prompt with the turn's data filled in.
#[must_use]
pub fn render_extractor_prompt(
    language: &str,
    existing_state: &str,
    user_request: &str,
    game_master_response: &str,
) -> String {
    system_prompt(Purpose::JournalExtractor, language)
        .replace("{existing_state}", existing_state)
        .replace("{user_request}", user_request)
        .replace("{game_master_response}", game_master_response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_language_falls_back_to_english() {
        assert_eq!(
            system_prompt(Purpose::GameMaster, "xx"),
            system_prompt(Purpose::GameMaster, "en")
        );
    }

    #[test]
    fn test_extractor_prompt_substitutes_all_placeholders() {
        let prompt = render_extractor_prompt("en", "{\"quests\":[]}", "open the door", "It creaks.");

        assert!(prompt.contains("{\"quests\":[]}"));
        assert!(prompt.contains("open the door"));
        assert!(prompt.contains("It creaks."));
        assert!(!prompt.contains("{existing_state}"));
        assert!(!prompt.contains("{user_request}"));
        assert!(!prompt.contains("{game_master_response}"));
    }
}
