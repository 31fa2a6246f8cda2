//! Persisted player state boundary.
//!
//! The engine only talks to `Storage`; SQL backends live outside this
//! workspace and implement the same trait.

pub mod in_memory;
pub mod json_file;
pub mod r#trait;

pub use in_memory::InMemoryStorage;
pub use json_file::JsonFileStorage;
pub use r#trait::{Storage, StorageError};
