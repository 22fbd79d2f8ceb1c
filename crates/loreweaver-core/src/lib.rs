//! Loreweaver Core — shared domain model and boundary traits.
//!
//! This crate defines the entities owned by a game session, the error
//! taxonomy, and the traits behind which the persistence engine and the
//! generative text provider live. It contains no infrastructure code.

pub mod clock;
pub mod error;
pub mod model;
pub mod provider;
pub mod store;
