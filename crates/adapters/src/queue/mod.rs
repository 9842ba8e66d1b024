//! Queue adapters: an in-memory backend and a durable, SQLite-backed one.

pub mod durable;
pub mod memory;

pub use durable::SqliteQueue;
pub use memory::InMemoryQueue;
