//! Repository traits

use async_trait::async_trait;
use serde::Serialize;
use switchboard_core::{Entity, EntityType, ScopeGroup, SearchRequest, SearchResults};

use crate::error::SearchResult;

/// Outcome of a full index rebuild
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    pub indexed: usize,
    pub failed: usize,
}

/// Outcome of a bulk group import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub failed: usize,
    /// `(group name, error)` for each failure
    pub errors: Vec<(String, String)>,
}

/// Search index over registry entities
///
/// Mutations and searches are best-effort: failures are logged and
/// published as events, never returned. The index is a projection of the
/// primary store and [`rebuild_index`](Self::rebuild_index) restores it.
#[async_trait]
pub trait SearchRepository: Send + Sync {
    /// Create indices and pipelines. Safe to call repeatedly.
    async fn initialize(&self) -> SearchResult<()>;

    /// Upsert the document for `entity` with the given visibility
    async fn index_entity(&self, entity: &Entity, is_enabled: bool);

    /// Like [`index_entity`](Self::index_entity) but reports the error
    async fn try_index_entity(&self, entity: &Entity, is_enabled: bool) -> SearchResult<()>;

    /// Remove the document at `path` from every entity index
    async fn remove_entity(&self, path: &str);

    /// Remove only the `entity_type` document at `path`, leaving other
    /// types registered at the same path in place
    async fn remove_entity_of(&self, entity_type: EntityType, path: &str);

    /// Ranked results grouped by type; empty on any failure
    async fn search(&self, request: &SearchRequest) -> SearchResults;

    /// Drop and re-derive the namespace's entity indices from the primary store
    async fn rebuild_index(&self) -> SearchResult<RebuildReport>;

    /// Entity documents currently indexed in this namespace
    async fn document_count(&self) -> SearchResult<usize>;
}

/// Scope groups, stored as three documents each
#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn upsert_group(&self, group: &ScopeGroup) -> SearchResult<()>;

    async fn get_group(&self, name: &str) -> SearchResult<Option<ScopeGroup>>;

    /// Returns whether any of the group's documents existed
    async fn delete_group(&self, name: &str) -> SearchResult<bool>;

    async fn list_groups(&self) -> SearchResult<Vec<ScopeGroup>>;

    async fn import_groups(&self, groups: &[ScopeGroup]) -> SearchResult<ImportReport> {
        switchboard_core::limits::validate_group_batch(groups.len())
            .map_err(|e| crate::error::SearchError::InvalidInput(e.to_string()))?;

        let mut report = ImportReport::default();
        for group in groups {
            match self.upsert_group(group).await {
                Ok(()) => report.imported += 1,
                Err(e) => {
                    tracing::warn!("Failed to import group {}: {}", group.name, e);
                    report.failed += 1;
                    report.errors.push((group.name.clone(), e.to_string()));
                }
            }
        }
        Ok(report)
    }
}
