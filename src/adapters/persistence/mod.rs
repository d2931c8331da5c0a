//! Preference storage adapters. Implement KeyValueStore.

pub mod json_kv;
pub mod memory_kv;
pub mod sqlite_kv;

pub use json_kv::JsonKvStore;
pub use memory_kv::MemoryKvStore;
pub use sqlite_kv::SqliteKvStore;
