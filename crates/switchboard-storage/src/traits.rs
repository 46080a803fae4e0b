//! Primary store trait definitions

use crate::error::StorageResult;
use async_trait::async_trait;
use switchboard_core::{Entity, EntityType};

/// Trait for primary-of-record entity stores
///
/// Paths passed in are expected to be normalized.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Initialize the storage (create tables, etc.)
    async fn initialize(&self) -> StorageResult<()>;

    /// Health check
    async fn health_check(&self) -> StorageResult<bool>;

    /// Insert or replace an entity, keyed by type and path
    async fn save_entity(&self, entity: &Entity) -> StorageResult<()>;

    /// Get an entity by type and path
    async fn get_entity(&self, entity_type: EntityType, path: &str) -> StorageResult<Option<Entity>>;

    /// List entities, optionally of one type
    async fn list_entities(&self, entity_type: Option<EntityType>) -> StorageResult<Vec<Entity>>;

    /// Delete an entity. Returns whether it existed.
    async fn delete_entity(&self, entity_type: EntityType, path: &str) -> StorageResult<bool>;

    /// Flip the enabled flag and return the updated entity, if present
    async fn set_enabled(
        &self,
        entity_type: EntityType,
        path: &str,
        enabled: bool,
    ) -> StorageResult<Option<Entity>> {
        let Some(mut entity) = self.get_entity(entity_type, path).await? else {
            return Ok(None);
        };
        entity.is_enabled = enabled;
        entity.touch();
        self.save_entity(&entity).await?;
        Ok(Some(entity))
    }

    /// Number of stored entities
    async fn count(&self) -> StorageResult<usize> {
        Ok(self.list_entities(None).await?.len())
    }
}
