//! Switchboard Storage - Primary entity stores
//!
//! The primary store owns canonical entity state. The search index is a
//! projection of it and is rebuilt from it on demand.

#![allow(clippy::result_large_err)]

pub mod error;
pub mod migration;
pub mod traits;

#[cfg(feature = "redb")]
pub mod redb;

pub mod memory;

pub use error::{StorageError, StorageResult};
pub use migration::{Migratable, SchemaVersion, CURRENT_VERSION};
pub use traits::EntityStore;

#[cfg(feature = "redb")]
pub use redb::RedbStore;

pub use memory::MemoryStore;
