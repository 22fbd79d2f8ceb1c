//! Loreweaver Store — SQLite implementation of the `GameStore` trait.

pub mod schema;
mod sqlite_store;

pub use sqlite_store::SqliteStore;
