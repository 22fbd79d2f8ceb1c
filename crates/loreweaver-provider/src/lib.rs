//! Loreweaver Provider — Ollama-backed implementation of the
//! `NarrativeProvider` trait.

mod ollama;
pub mod prompts;

pub use ollama::OllamaProvider;
