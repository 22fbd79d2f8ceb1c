//! Route modules.

pub mod game;
pub mod health;
pub mod session;
