//! Switchboard Search - Indexing and search for the registry
//!
//! The search index is a secondary projection of the primary store. Two
//! backends implement [`SearchRepository`]:
//!
//! - [`EmbeddedBackend`]: in-process cosine scan, optionally persisted to redb
//! - [`ClusteredBackend`]: OpenSearch-compatible cluster with hybrid
//!   BM25 + k-NN ranking fused by a search pipeline
//!
//! [`RepositoryRegistry`] picks and memoizes one of them per process, and
//! [`RegistryService`] drives it from entity CRUD through [`IndexingHooks`].

#![allow(clippy::result_large_err)]

pub mod backend;
pub mod clustered;
pub mod config;
pub mod document;
pub mod embedded;
pub mod embedding;
pub mod error;
pub mod events;
pub mod factory;
pub mod groups;
pub mod lifecycle;
pub mod ranking;
pub mod traits;

pub use backend::SearchBackend;
pub use clustered::ClusteredBackend;
pub use config::{BackendKind, ClusterConfig, EmbeddingConfig, EmbeddingFailurePolicy, SearchConfig};
pub use document::{IndexDocument, IndexFamily};
pub use embedded::EmbeddedBackend;
pub use embedding::{create_provider, EmbeddingProvider, HashEmbedder};
pub use error::{SearchError, SearchResult};
pub use events::{EventCounts, EventSink, IndexEvent, IndexOperation};
pub use factory::RepositoryRegistry;
pub use lifecycle::{EntityPatch, IndexingHooks, RegistryService};
pub use traits::{GroupRepository, ImportReport, RebuildReport, SearchRepository};
