//! Switchboard Core - Entity model for the registry
//!
//! This crate provides the data types shared by the primary store and the
//! search subsystem: registry entities, path handling, search requests and
//! results, and scope groups.

pub mod entity;
pub mod error;
pub mod group;
pub mod limits;
pub mod path;
pub mod query;

pub use entity::{AgentSkill, Entity, EntityKind, EntityType, NestedSummary, Tool};
pub use error::{Error, Result};
pub use group::{ScopeGroup, ServerAccessRule};
pub use limits::{validate_entity, ValidationError};
pub use path::{document_id, normalize_path, path_from_document_id};
pub use query::{tokenize, EntityHit, SearchRequest, SearchResults, ToolHit};
