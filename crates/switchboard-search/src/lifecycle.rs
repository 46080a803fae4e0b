//! Keeping the index in step with entity CRUD
//!
//! [`RegistryService`] owns CRUD against the primary store and calls
//! [`IndexingHooks`] after each successful mutation. Hooks never fail: the
//! CRUD outcome does not depend on whether the index could be updated.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use switchboard_core::{normalize_path, validate_entity, AgentSkill, Entity, EntityKind, EntityType, Tool};
use switchboard_storage::{EntityStore, StorageError, StorageResult};

use crate::backend::SearchBackend;
use crate::events::IndexOperation;
use crate::factory::RepositoryRegistry;
use crate::traits::SearchRepository;

/// Index updates run after CRUD operations
#[derive(Clone)]
pub struct IndexingHooks {
    registry: Arc<RepositoryRegistry>,
}

impl IndexingHooks {
    pub fn new(registry: Arc<RepositoryRegistry>) -> Self {
        Self { registry }
    }

    async fn repository(
        &self,
        operation: IndexOperation,
        entity_type: Option<EntityType>,
        path: &str,
    ) -> Option<Arc<SearchBackend>> {
        match self.registry.repository().await {
            Ok(repository) => Some(repository),
            Err(e) => {
                self.registry
                    .events()
                    .indexing_failed(operation, entity_type, path, e);
                None
            }
        }
    }

    async fn index(&self, entity: &Entity) {
        if let Some(repository) = self
            .repository(IndexOperation::Index, Some(entity.entity_type()), &entity.path)
            .await
        {
            repository.index_entity(entity, entity.is_enabled).await;
        }
    }

    pub async fn after_create(&self, entity: &Entity) {
        self.index(entity).await;
    }

    /// `entity` is the merged, saved state
    pub async fn after_update(&self, entity: &Entity) {
        self.index(entity).await;
    }

    pub async fn after_delete(&self, entity_type: EntityType, path: &str) {
        if let Some(repository) = self
            .repository(IndexOperation::Remove, Some(entity_type), path)
            .await
        {
            repository.remove_entity_of(entity_type, path).await;
        }
    }

    pub async fn after_toggle(&self, entity: &Entity) {
        self.index(entity).await;
    }
}

/// Partial update; `None` fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Servers only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    /// Agents only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<AgentSkill>>,
    /// Skills only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_tools: Option<Vec<String>>,
    /// Merged key by key; a `null` value removes the key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl EntityPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.tags.is_none()
            && self.tools.is_none()
            && self.skills.is_none()
            && self.allowed_tools.is_none()
            && self.metadata.is_none()
    }

    /// Apply to `entity`. Nested fields for another entity type are rejected.
    pub fn apply(self, entity: &mut Entity) -> StorageResult<()> {
        if let Some(name) = self.name {
            entity.name = name;
        }
        if let Some(description) = self.description {
            entity.description = description;
        }
        if let Some(tags) = self.tags {
            entity.tags = tags;
        }

        let entity_type = entity.entity_type();
        let wrong_kind =
            |field: &str| StorageError::Invalid(format!("{} cannot be set on a {}", field, entity_type));
        match &mut entity.kind {
            EntityKind::Server { tools } => {
                if self.skills.is_some() {
                    return Err(wrong_kind("skills"));
                }
                if self.allowed_tools.is_some() {
                    return Err(wrong_kind("allowed_tools"));
                }
                if let Some(new_tools) = self.tools {
                    *tools = new_tools;
                }
            }
            EntityKind::Agent { skills, .. } => {
                if self.tools.is_some() {
                    return Err(wrong_kind("tools"));
                }
                if self.allowed_tools.is_some() {
                    return Err(wrong_kind("allowed_tools"));
                }
                if let Some(new_skills) = self.skills {
                    *skills = new_skills;
                }
            }
            EntityKind::Skill { allowed_tools } => {
                if self.tools.is_some() {
                    return Err(wrong_kind("tools"));
                }
                if self.skills.is_some() {
                    return Err(wrong_kind("skills"));
                }
                if let Some(new_allowed) = self.allowed_tools {
                    *allowed_tools = new_allowed;
                }
            }
        }

        if let Some(metadata) = self.metadata {
            for (key, value) in metadata {
                if value.is_null() {
                    entity.metadata.remove(&key);
                } else {
                    entity.metadata.insert(key, value);
                }
            }
        }

        entity.touch();
        Ok(())
    }
}

/// Entity CRUD over the primary store, with index hooks
pub struct RegistryService {
    store: Arc<dyn EntityStore>,
    hooks: IndexingHooks,
}

impl RegistryService {
    pub fn new(store: Arc<dyn EntityStore>, hooks: IndexingHooks) -> Self {
        Self { store, hooks }
    }

    /// Service over the registry's own store
    pub fn from_registry(registry: Arc<RepositoryRegistry>) -> Self {
        let store = Arc::clone(registry.store());
        Self::new(store, IndexingHooks::new(registry))
    }

    pub async fn create(&self, mut entity: Entity) -> StorageResult<Entity> {
        entity.path = normalize_path(&entity.path)?;
        validate_entity(&entity).map_err(|e| StorageError::Invalid(e.to_string()))?;

        if self
            .store
            .get_entity(entity.entity_type(), &entity.path)
            .await?
            .is_some()
        {
            return Err(StorageError::DuplicateEntity(format!(
                "{} {}",
                entity.entity_type(),
                entity.path
            )));
        }

        self.store.save_entity(&entity).await?;
        tracing::info!("Created {} {}", entity.entity_type(), entity.path);
        self.hooks.after_create(&entity).await;
        Ok(entity)
    }

    pub async fn update(&self, entity_type: EntityType, path: &str, patch: EntityPatch) -> StorageResult<Entity> {
        let path = normalize_path(path)?;
        let mut entity = self
            .store
            .get_entity(entity_type, &path)
            .await?
            .ok_or_else(|| StorageError::EntityNotFound(format!("{} {}", entity_type, path)))?;

        patch.apply(&mut entity)?;
        validate_entity(&entity).map_err(|e| StorageError::Invalid(e.to_string()))?;

        self.store.save_entity(&entity).await?;
        tracing::info!("Updated {} {}", entity_type, path);
        self.hooks.after_update(&entity).await;
        Ok(entity)
    }

    /// Returns whether the entity existed
    pub async fn delete(&self, entity_type: EntityType, path: &str) -> StorageResult<bool> {
        let path = normalize_path(path)?;
        let existed = self.store.delete_entity(entity_type, &path).await?;
        if existed {
            tracing::info!("Deleted {} {}", entity_type, path);
        }
        // Clear any stale document even when the store had nothing
        self.hooks.after_delete(entity_type, &path).await;
        Ok(existed)
    }

    pub async fn set_enabled(&self, entity_type: EntityType, path: &str, enabled: bool) -> StorageResult<Entity> {
        let path = normalize_path(path)?;
        let entity = self
            .store
            .set_enabled(entity_type, &path, enabled)
            .await?
            .ok_or_else(|| StorageError::EntityNotFound(format!("{} {}", entity_type, path)))?;

        tracing::info!(
            "{} {} {}",
            if enabled { "Enabled" } else { "Disabled" },
            entity_type,
            path
        );
        self.hooks.after_toggle(&entity).await;
        Ok(entity)
    }

    pub async fn get(&self, entity_type: EntityType, path: &str) -> StorageResult<Option<Entity>> {
        self.store.get_entity(entity_type, &normalize_path(path)?).await
    }

    pub async fn list(&self, entity_type: Option<EntityType>) -> StorageResult<Vec<Entity>> {
        self.store.list_entities(entity_type).await
    }
}
