//! Shared application state.

use std::sync::Arc;

use loreweaver_core::clock::Clock;
use loreweaver_core::store::GameStore;
use loreweaver_engine::turn::TurnEngine;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Persistence for sessions, messages, entries, and the change log.
    pub store: Arc<dyn GameStore>,
    /// Turn orchestrator; owns its own store/provider/clock handles.
    pub engine: Arc<TurnEngine>,
    /// Time source for session creation timestamps.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(store: Arc<dyn GameStore>, engine: Arc<TurnEngine>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            engine,
            clock,
        }
    }
}
