//! In-memory entity store for testing

use crate::error::{StorageError, StorageResult};
use crate::traits::EntityStore;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;
use switchboard_core::{Entity, EntityType};

/// In-memory entity store
///
/// Useful for testing and temporary registries.
pub struct MemoryStore {
    entities: RwLock<BTreeMap<(EntityType, String), Entity>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn initialize(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<bool> {
        Ok(true)
    }

    async fn save_entity(&self, entity: &Entity) -> StorageResult<()> {
        let mut entities = self
            .entities
            .write()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        entities.insert((entity.entity_type(), entity.path.clone()), entity.clone());
        Ok(())
    }

    async fn get_entity(&self, entity_type: EntityType, path: &str) -> StorageResult<Option<Entity>> {
        let entities = self
            .entities
            .read()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        Ok(entities.get(&(entity_type, path.to_string())).cloned())
    }

    async fn list_entities(&self, entity_type: Option<EntityType>) -> StorageResult<Vec<Entity>> {
        let entities = self
            .entities
            .read()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        Ok(entities
            .iter()
            .filter(|((t, _), _)| entity_type.map_or(true, |wanted| *t == wanted))
            .map(|(_, e)| e.clone())
            .collect())
    }

    async fn delete_entity(&self, entity_type: EntityType, path: &str) -> StorageResult<bool> {
        let mut entities = self
            .entities
            .write()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        Ok(entities.remove(&(entity_type, path.to_string())).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        store.initialize().await.unwrap();

        let server = Entity::server("/weather", "Weather Service");
        store.save_entity(&server).await.unwrap();

        let retrieved = store.get_entity(EntityType::Server, "/weather").await.unwrap();
        assert_eq!(retrieved.unwrap().name, "Weather Service");

        // Same path under another type is a different entity
        assert!(store.get_entity(EntityType::Agent, "/weather").await.unwrap().is_none());

        assert!(store.delete_entity(EntityType::Server, "/weather").await.unwrap());
        assert!(!store.delete_entity(EntityType::Server, "/weather").await.unwrap());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_enabled() {
        let store = MemoryStore::new();
        store.save_entity(&Entity::agent("/travel", "Travel")).await.unwrap();

        let updated = store
            .set_enabled(EntityType::Agent, "/travel", false)
            .await
            .unwrap()
            .unwrap();
        assert!(!updated.is_enabled);

        let missing = store.set_enabled(EntityType::Agent, "/nope", false).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_list_by_type() {
        let store = MemoryStore::new();
        store.save_entity(&Entity::server("/a", "A")).await.unwrap();
        store.save_entity(&Entity::server("/b", "B")).await.unwrap();
        store.save_entity(&Entity::skill("/c", "C")).await.unwrap();

        assert_eq!(store.list_entities(Some(EntityType::Server)).await.unwrap().len(), 2);
        assert_eq!(store.list_entities(None).await.unwrap().len(), 3);
    }
}
