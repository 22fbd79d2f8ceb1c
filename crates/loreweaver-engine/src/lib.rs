//! Loreweaver Engine — the turn-processing core.
//!
//! Three components, consumed bottom-up by the orchestrator:
//!
//! - [`context`] converts persistent session state into a bounded textual
//!   snapshot for the provider.
//! - [`journal`] reconciles provider-proposed entity edits against current
//!   entries and records reversible change-log entries.
//! - [`turn`] drives the per-turn sequence and implements whole-turn undo
//!   and history compaction.

pub mod context;
pub mod journal;
pub mod turn;

pub use context::AssembledContext;
pub use turn::{EngineConfig, TurnEngine};
