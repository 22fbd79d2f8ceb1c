//! Loreweaver HTTP API: axum routes over the turn engine and game store.

pub mod error;
pub mod routes;
pub mod state;
