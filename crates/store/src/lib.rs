//! Attribute store implementations for Keepsake.

pub mod memory;
pub mod seed;
pub mod sqlite;

pub use memory::MemoryStore;
pub use seed::seed_default_definitions;
pub use sqlite::{GenerationLogEntry, SqliteStore};
