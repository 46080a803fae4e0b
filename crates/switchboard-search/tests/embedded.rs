//! Embedded backend through the registry and CRUD service

mod common;

use common::FailingEmbedder;
use std::sync::Arc;
use switchboard_core::{Entity, EntityType, ScopeGroup, SearchRequest};
use switchboard_search::{
    BackendKind, EmbeddedBackend, EmbeddingFailurePolicy, EntityPatch, EventSink, GroupRepository, IndexEvent,
    RegistryService, RepositoryRegistry, SearchBackend, SearchConfig, SearchError, SearchRepository,
};
use switchboard_storage::{EntityStore, MemoryStore, RedbStore};
use tempfile::tempdir;

fn registry(config: SearchConfig) -> Arc<RepositoryRegistry> {
    Arc::new(RepositoryRegistry::new(config, Arc::new(MemoryStore::new())))
}

#[tokio::test]
async fn service_and_search_round_trip() {
    let registry = registry(SearchConfig::default());
    let service = RegistryService::from_registry(Arc::clone(&registry));

    service
        .create(
            Entity::server("/weather", "Weather Service")
                .with_tag("weather")
                .with_tag("api")
                .with_tool("get_forecast", "Forecast for a city"),
        )
        .await
        .unwrap();
    service
        .create(Entity::server("/blog", "Blog Engine").with_description("Posts and comments"))
        .await
        .unwrap();
    service
        .create(Entity::agent("/forecaster", "Weather Forecaster").with_skill("forecast", "Daily weather"))
        .await
        .unwrap();

    let repo = registry.repository().await.unwrap();
    let results = repo.search(&SearchRequest::new("weather")).await;
    assert_eq!(results.servers[0].path, "/weather");
    assert_eq!(results.agents[0].path, "/forecaster");

    let patch = EntityPatch {
        name: Some("Blog Engine".to_string()),
        tags: Some(vec!["weather".to_string()]),
        ..Default::default()
    };
    service.update(EntityType::Server, "/blog", patch).await.unwrap();
    let results = repo.search(&SearchRequest::new("weather")).await;
    assert!(results.servers.iter().any(|h| h.path == "/blog"));

    assert_eq!(registry.events().counts().indexed, 4);
    assert_eq!(registry.events().counts().failures(), 0);
}

#[tokio::test]
async fn buckets_are_truncated_independently() {
    let registry = registry(SearchConfig::default());
    let repo = registry.repository().await.unwrap();

    for i in 0..20 {
        repo.index_entity(&Entity::server(format!("/weather-{:02}", i), "Weather"), true)
            .await;
    }
    repo.index_entity(&Entity::agent("/weather-agent", "Weather"), true)
        .await;

    let results = repo
        .search(&SearchRequest::new("weather").with_max_results(10))
        .await;
    assert_eq!(results.servers.len(), 10);
    assert_eq!(results.agents.len(), 1);
}

#[tokio::test]
async fn toggle_converges_index_visibility() {
    let registry = registry(SearchConfig::default());
    let service = RegistryService::from_registry(Arc::clone(&registry));
    let mut events = registry.events().subscribe();

    service.create(Entity::skill("/pdf", "PDF Reader")).await.unwrap();
    service.set_enabled(EntityType::Skill, "/pdf", false).await.unwrap();

    let repo = registry.repository().await.unwrap();
    let request = SearchRequest::new("pdf reader").enabled_only(true);
    assert!(repo.search(&request).await.skills.is_empty());

    service.set_enabled(EntityType::Skill, "/pdf", true).await.unwrap();
    assert_eq!(repo.search(&request).await.skills.len(), 1);

    let first = events.recv().await.unwrap();
    assert_eq!(
        first,
        IndexEvent::Indexed {
            entity_type: EntityType::Skill,
            path: "/pdf".to_string()
        }
    );
}

#[tokio::test]
async fn rebuild_restores_a_lost_index() {
    let dir = tempdir().unwrap();
    let store: Arc<dyn EntityStore> = Arc::new(RedbStore::open(dir.path().join("registry.redb")).unwrap());
    let config = SearchConfig::default().with_data_dir(dir.path());
    let registry = Arc::new(RepositoryRegistry::new(config, Arc::clone(&store)));
    let service = RegistryService::from_registry(Arc::clone(&registry));

    service.create(Entity::server("/weather", "Weather")).await.unwrap();
    service.create(Entity::agent("/travel", "Travel")).await.unwrap();
    service.set_enabled(EntityType::Agent, "/travel", false).await.unwrap();

    let repo = registry.repository().await.unwrap();
    repo.remove_entity("/weather").await;
    repo.remove_entity("/travel").await;
    assert_eq!(repo.document_count().await.unwrap(), 0);

    let report = repo.rebuild_index().await.unwrap();
    assert_eq!(report.indexed, 2);
    assert_eq!(repo.document_count().await.unwrap(), 2);

    let hidden = repo
        .search(&SearchRequest::new("travel").enabled_only(true))
        .await;
    assert!(hidden.agents.is_empty());
}

#[tokio::test]
async fn registry_switches_backend_after_reset() {
    let registry = registry(SearchConfig::default());
    let repo = registry.repository().await.unwrap();
    assert_eq!(repo.kind(), BackendKind::Embedded);

    registry
        .set_config(SearchConfig::default().with_cluster_url("http://127.0.0.1:1"))
        .unwrap();
    registry.reset().await;
    let repo = registry.repository().await.unwrap();
    assert!(matches!(*repo, SearchBackend::Clustered(_)));

    // Unreachable cluster: search fails open
    assert!(repo.search(&SearchRequest::new("weather")).await.is_empty());
    assert_eq!(registry.events().counts().search_failed, 1);
}

#[tokio::test]
async fn embedding_failure_has_no_keyword_fallback() {
    for policy in [EmbeddingFailurePolicy::KeywordOnly, EmbeddingFailurePolicy::Abort] {
        let mut config = SearchConfig::default();
        config.embedding_failure = policy;
        let events = EventSink::new();
        let backend = EmbeddedBackend::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(FailingEmbedder { dimension: 384 }),
            events.clone(),
        )
        .unwrap();

        assert!(matches!(
            backend.try_index_entity(&Entity::server("/weather", "Weather"), true).await,
            Err(SearchError::Embedding(_))
        ));
        backend
            .index_entity(&Entity::server("/weather", "Weather"), true)
            .await;
        assert_eq!(backend.document_count().await.unwrap(), 0);
        assert!(backend.search(&SearchRequest::new("weather")).await.is_empty());

        let counts = events.counts();
        assert_eq!(counts.indexing_failed, 1);
        assert_eq!(counts.search_failed, 1);
        assert_eq!(counts.embedding_degraded, 0);
    }
}

#[tokio::test]
async fn groups_through_the_backend_enum() {
    let registry = registry(SearchConfig::default());
    let repo = registry.repository().await.unwrap();

    let report = repo
        .import_groups(&[
            ScopeGroup::new("admins").with_mapping("admin"),
            ScopeGroup::new("readers").with_ui_permission("list_service", ["all"]),
        ])
        .await
        .unwrap();
    assert_eq!(report.imported, 2);

    let readers = repo.get_group("readers").await.unwrap().unwrap();
    assert_eq!(readers.ui_permissions["list_service"], vec!["all"]);
    assert_eq!(repo.list_groups().await.unwrap().len(), 2);

    assert!(repo.delete_group("admins").await.unwrap());
    assert_eq!(repo.get_group("admins").await.unwrap(), None);
}
