//! The closed set of search backends

use async_trait::async_trait;
use std::sync::Arc;
use switchboard_core::{Entity, EntityType, ScopeGroup, SearchRequest, SearchResults};
use switchboard_storage::EntityStore;

use crate::clustered::ClusteredBackend;
use crate::config::{BackendKind, SearchConfig};
use crate::embedded::EmbeddedBackend;
use crate::embedding::create_provider;
use crate::error::{SearchError, SearchResult};
use crate::events::EventSink;
use crate::traits::{GroupRepository, ImportReport, RebuildReport, SearchRepository};

/// One concrete backend, chosen by configuration
pub enum SearchBackend {
    Embedded(EmbeddedBackend),
    Clustered(ClusteredBackend),
}

impl SearchBackend {
    /// Build the backend the configuration selects, with its embedding provider
    pub fn from_config(config: SearchConfig, store: Arc<dyn EntityStore>, events: EventSink) -> SearchResult<Self> {
        Self::with_index_file(config, store, events, None)
    }

    /// Like [`from_config`](Self::from_config), reusing an already open
    /// embedded index file instead of opening `data_dir` again
    pub fn with_index_file(
        config: SearchConfig,
        store: Arc<dyn EntityStore>,
        events: EventSink,
        index_file: Option<Arc<redb::Database>>,
    ) -> SearchResult<Self> {
        config.validate()?;
        let provider = create_provider(&config.embedding)?;
        let kind = config.backend_kind();
        tracing::info!("Using {} search backend (namespace {})", kind, config.namespace);

        Ok(match kind {
            BackendKind::Embedded => Self::Embedded(match index_file {
                Some(db) => EmbeddedBackend::with_database(config, store, provider, events, Some(db))?,
                None => EmbeddedBackend::new(config, store, provider, events)?,
            }),
            BackendKind::Clustered => Self::Clustered(ClusteredBackend::new(config, store, provider, events)?),
        })
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Embedded(_) => BackendKind::Embedded,
            Self::Clustered(_) => BackendKind::Clustered,
        }
    }

    fn expect_type(entity: &Entity, expected: EntityType) -> SearchResult<()> {
        if entity.entity_type() == expected {
            Ok(())
        } else {
            Err(SearchError::InvalidInput(format!(
                "{} is a {}, not a {}",
                entity.path,
                entity.entity_type(),
                expected
            )))
        }
    }

    /// Index an entity that must be a server
    pub async fn index_server(&self, server: &Entity, is_enabled: bool) -> SearchResult<()> {
        Self::expect_type(server, EntityType::Server)?;
        self.index_entity(server, is_enabled).await;
        Ok(())
    }

    /// Index an entity that must be an agent
    pub async fn index_agent(&self, agent: &Entity, is_enabled: bool) -> SearchResult<()> {
        Self::expect_type(agent, EntityType::Agent)?;
        self.index_entity(agent, is_enabled).await;
        Ok(())
    }

    /// Index an entity that must be a skill
    pub async fn index_skill(&self, skill: &Entity, is_enabled: bool) -> SearchResult<()> {
        Self::expect_type(skill, EntityType::Skill)?;
        self.index_entity(skill, is_enabled).await;
        Ok(())
    }
}

#[async_trait]
impl SearchRepository for SearchBackend {
    async fn initialize(&self) -> SearchResult<()> {
        match self {
            Self::Embedded(b) => b.initialize().await,
            Self::Clustered(b) => b.initialize().await,
        }
    }

    async fn index_entity(&self, entity: &Entity, is_enabled: bool) {
        match self {
            Self::Embedded(b) => b.index_entity(entity, is_enabled).await,
            Self::Clustered(b) => b.index_entity(entity, is_enabled).await,
        }
    }

    async fn try_index_entity(&self, entity: &Entity, is_enabled: bool) -> SearchResult<()> {
        match self {
            Self::Embedded(b) => b.try_index_entity(entity, is_enabled).await,
            Self::Clustered(b) => b.try_index_entity(entity, is_enabled).await,
        }
    }

    async fn remove_entity(&self, path: &str) {
        match self {
            Self::Embedded(b) => b.remove_entity(path).await,
            Self::Clustered(b) => b.remove_entity(path).await,
        }
    }

    async fn remove_entity_of(&self, entity_type: EntityType, path: &str) {
        match self {
            Self::Embedded(b) => b.remove_entity_of(entity_type, path).await,
            Self::Clustered(b) => b.remove_entity_of(entity_type, path).await,
        }
    }

    async fn search(&self, request: &SearchRequest) -> SearchResults {
        match self {
            Self::Embedded(b) => b.search(request).await,
            Self::Clustered(b) => b.search(request).await,
        }
    }

    async fn rebuild_index(&self) -> SearchResult<RebuildReport> {
        match self {
            Self::Embedded(b) => b.rebuild_index().await,
            Self::Clustered(b) => b.rebuild_index().await,
        }
    }

    async fn document_count(&self) -> SearchResult<usize> {
        match self {
            Self::Embedded(b) => b.document_count().await,
            Self::Clustered(b) => b.document_count().await,
        }
    }
}

#[async_trait]
impl GroupRepository for SearchBackend {
    async fn upsert_group(&self, group: &ScopeGroup) -> SearchResult<()> {
        match self {
            Self::Embedded(b) => b.upsert_group(group).await,
            Self::Clustered(b) => b.upsert_group(group).await,
        }
    }

    async fn get_group(&self, name: &str) -> SearchResult<Option<ScopeGroup>> {
        match self {
            Self::Embedded(b) => b.get_group(name).await,
            Self::Clustered(b) => b.get_group(name).await,
        }
    }

    async fn delete_group(&self, name: &str) -> SearchResult<bool> {
        match self {
            Self::Embedded(b) => b.delete_group(name).await,
            Self::Clustered(b) => b.delete_group(name).await,
        }
    }

    async fn list_groups(&self) -> SearchResult<Vec<ScopeGroup>> {
        match self {
            Self::Embedded(b) => b.list_groups().await,
            Self::Clustered(b) => b.list_groups().await,
        }
    }

    async fn import_groups(&self, groups: &[ScopeGroup]) -> SearchResult<ImportReport> {
        match self {
            Self::Embedded(b) => b.import_groups(groups).await,
            Self::Clustered(b) => b.import_groups(groups).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_storage::MemoryStore;

    fn build(config: SearchConfig) -> SearchResult<SearchBackend> {
        SearchBackend::from_config(config, Arc::new(MemoryStore::new()), EventSink::new())
    }

    #[test]
    fn test_from_config_selects_variant() {
        let embedded = build(SearchConfig::default()).unwrap();
        assert!(matches!(embedded, SearchBackend::Embedded(_)));

        let clustered = build(SearchConfig::default().with_cluster_url("http://127.0.0.1:1")).unwrap();
        assert!(matches!(clustered, SearchBackend::Clustered(_)));
        assert_eq!(clustered.kind(), BackendKind::Clustered);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(matches!(
            build(SearchConfig::default().with_backend(BackendKind::Clustered)),
            Err(SearchError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_typed_index_helpers() {
        let backend = build(SearchConfig::default()).unwrap();
        backend
            .index_server(&Entity::server("/weather", "Weather"), true)
            .await
            .unwrap();
        backend.index_agent(&Entity::agent("/travel", "Travel"), true).await.unwrap();
        backend.index_skill(&Entity::skill("/pdf", "PDF"), true).await.unwrap();
        assert!(backend
            .index_agent(&Entity::server("/blog", "Blog"), true)
            .await
            .is_err());
        assert_eq!(backend.document_count().await.unwrap(), 3);
    }
}
