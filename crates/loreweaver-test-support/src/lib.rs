//! Shared test mocks and utilities for the Loreweaver narrative engine.

mod clock;
mod provider;
mod store;

pub use clock::FixedClock;
pub use provider::{FailingProvider, ScriptedProvider};
pub use store::MemoryStore;
