//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A session was not found.
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    /// A journal entry was not found.
    #[error("entry not found: {0}")]
    EntryNotFound(i64),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

/// Errors surfaced by the generative text provider.
///
/// Callers in the turn pipeline never propagate these past the provider
/// boundary: narration failures degrade to an error-text reply, extraction
/// failures degrade to an empty proposal, and summarization failures leave
/// the prior summary untouched.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider could not be reached or failed fast.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider returned output that could not be interpreted.
    #[error("provider returned malformed output: {0}")]
    Malformed(String),
}
