//! SQLite-backed cache store.

pub mod schema;
mod store;

pub use store::SqliteStore;
