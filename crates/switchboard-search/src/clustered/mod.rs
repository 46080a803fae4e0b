//! Clustered backend
//!
//! Documents live in an OpenSearch-compatible cluster, one index per entity
//! type plus a scopes index, all suffixed with the namespace. Searches send
//! one `hybrid` query per requested type (BM25 `multi_match` plus `knn`)
//! through a server-side normalization pipeline, so each bucket is ranked
//! and truncated on its own.

mod client;
pub mod query;

pub use client::ClusterClient;

use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;
use switchboard_core::{document_id, normalize_path, Entity, EntityType, ScopeGroup, SearchRequest, SearchResults};
use switchboard_storage::EntityStore;

use crate::config::{EmbeddingFailurePolicy, SearchConfig};
use crate::document::{IndexDocument, IndexFamily};
use crate::embedding::EmbeddingProvider;
use crate::error::{SearchError, SearchResult};
use crate::events::{EventSink, IndexEvent, IndexOperation};
use crate::groups::{assemble_group, mapping_group_name, split_group, GroupFacet};
use crate::ranking::{assemble_results, ScoredDocument};
use crate::traits::{GroupRepository, RebuildReport, SearchRepository};

/// Upper bound on groups returned by `list_groups`
const MAX_LISTED_GROUPS: usize = 1000;

/// OpenSearch-compatible hybrid search backend
pub struct ClusteredBackend {
    config: SearchConfig,
    client: ClusterClient,
    store: Arc<dyn EntityStore>,
    provider: Arc<dyn EmbeddingProvider>,
    events: EventSink,
}

impl ClusteredBackend {
    pub fn new(
        config: SearchConfig,
        store: Arc<dyn EntityStore>,
        provider: Arc<dyn EmbeddingProvider>,
        events: EventSink,
    ) -> SearchResult<Self> {
        let client = ClusterClient::new(&config.cluster)?;
        Ok(Self {
            config,
            client,
            store,
            provider,
            events,
        })
    }

    fn entity_index(&self, entity_type: EntityType) -> String {
        self.config.index_name(IndexFamily::for_entity(entity_type))
    }

    fn scopes_index(&self) -> String {
        self.config.index_name(IndexFamily::Scopes)
    }

    /// Create the index, or check the dimension of the one already there
    async fn ensure_entity_index(&self, index: &str) -> SearchResult<()> {
        let expected = self.provider.dimension();
        if !self.client.index_exists(index).await? {
            return self
                .client
                .create_index(index, &query::entity_index_body(expected))
                .await;
        }

        let mapping = self.client.get_mapping(index).await?;
        match query::mapped_dimension(&mapping) {
            Some(actual) if actual != expected => Err(SearchError::Configuration(format!(
                "index {} has embedding dimension {} but the provider produces {}",
                index, actual, expected
            ))),
            Some(_) => Ok(()),
            None => Err(SearchError::Configuration(format!(
                "index {} exists without a knn_vector embedding mapping; run a rebuild",
                index
            ))),
        }
    }

    async fn ensure_scopes_index(&self) -> SearchResult<()> {
        let index = self.scopes_index();
        if self.client.index_exists(&index).await? {
            return Ok(());
        }
        self.client.create_index(&index, &query::scopes_index_body()).await
    }

    async fn try_remove(&self, entity_types: &[EntityType], path: &str) -> SearchResult<bool> {
        let id = document_id(&normalize_path(path)?);
        let refresh = self.config.cluster.refresh;
        let deletes = entity_types.iter().map(|&t| {
            let index = self.entity_index(t);
            let id = id.clone();
            async move { self.client.delete_document(&index, &id, refresh).await }
        });
        let existed = try_join_all(deletes).await?;
        Ok(existed.into_iter().any(|e| e))
    }

    async fn remove_from(&self, entity_types: &[EntityType], failed_type: Option<EntityType>, path: &str) {
        match self.try_remove(entity_types, path).await {
            Ok(true) => self.events.emit(IndexEvent::Removed {
                path: path.to_string(),
            }),
            Ok(false) => tracing::debug!("No indexed document at {}", path),
            Err(e) => self
                .events
                .indexing_failed(IndexOperation::Remove, failed_type, path, e),
        }
    }

    /// Query vector, or `None` to run keyword-only
    async fn query_vector(&self, query: &str) -> SearchResult<Option<Vec<f32>>> {
        match self.provider.encode_one(query).await {
            Ok(vector) => Ok(Some(vector)),
            Err(e) if self.config.embedding_failure == EmbeddingFailurePolicy::KeywordOnly => {
                tracing::warn!("Query embedding failed, searching by keyword only: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn try_search(&self, request: &SearchRequest) -> SearchResult<SearchResults> {
        let vector = self.query_vector(&request.query).await?;
        let pipeline = vector.as_ref().map(|_| self.config.cluster.pipeline.as_str());

        let searches = request.requested_types().into_iter().map(|entity_type| {
            let index = self.entity_index(entity_type);
            let body = query::entity_search_body(request, entity_type, vector.as_deref());
            async move {
                let response = self.client.search(&index, &body, pipeline).await?;
                query::parse_entity_hits(&response)
            }
        });

        let candidates: Vec<ScoredDocument> = try_join_all(searches).await?.into_iter().flatten().collect();
        Ok(assemble_results(request, candidates))
    }
}

#[async_trait]
impl SearchRepository for ClusteredBackend {
    async fn initialize(&self) -> SearchResult<()> {
        let pipeline = &self.config.cluster.pipeline;
        self.client
            .put_pipeline(pipeline, &query::pipeline_body(&self.config.cluster))
            .await?;
        tracing::debug!("Search pipeline {} in place", pipeline);

        for entity_type in EntityType::ALL {
            self.ensure_entity_index(&self.entity_index(entity_type)).await?;
        }
        self.ensure_scopes_index().await?;

        tracing::info!("Cluster indices ready for namespace {}", self.config.namespace);
        Ok(())
    }

    async fn index_entity(&self, entity: &Entity, is_enabled: bool) {
        match self.try_index_entity(entity, is_enabled).await {
            Ok(()) => self.events.emit(IndexEvent::Indexed {
                entity_type: entity.entity_type(),
                path: entity.path.clone(),
            }),
            Err(e) => self.events.indexing_failed(
                IndexOperation::Index,
                Some(entity.entity_type()),
                &entity.path,
                e,
            ),
        }
    }

    async fn try_index_entity(&self, entity: &Entity, is_enabled: bool) -> SearchResult<()> {
        let mut doc = IndexDocument::from_entity(entity, is_enabled)?;

        match self.provider.encode_one(&doc.text_for_embedding).await {
            Ok(embedding) => {
                doc = doc.with_embedding(embedding);
                doc.check_dimension(self.provider.dimension())?;
            }
            Err(e) if self.config.embedding_failure == EmbeddingFailurePolicy::KeywordOnly => {
                tracing::warn!("Indexing {} without embedding: {}", doc.path, e);
                self.events.emit(IndexEvent::EmbeddingDegraded {
                    entity_type: doc.entity_type,
                    path: doc.path.clone(),
                    error: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }

        let index = self.entity_index(doc.entity_type);
        self.client
            .put_document(&index, &doc.id(), &serde_json::to_value(&doc)?, self.config.cluster.refresh)
            .await?;
        tracing::debug!("Indexed {} {} into {}", doc.entity_type, doc.path, index);
        Ok(())
    }

    async fn remove_entity(&self, path: &str) {
        self.remove_from(&EntityType::ALL, None, path).await;
    }

    async fn remove_entity_of(&self, entity_type: EntityType, path: &str) {
        self.remove_from(&[entity_type], Some(entity_type), path).await;
    }

    async fn search(&self, request: &SearchRequest) -> SearchResults {
        if request.is_blank() {
            return SearchResults::empty();
        }
        match self.try_search(request).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("Search for {:?} failed: {}", request.query, e);
                self.events.emit(IndexEvent::SearchFailed {
                    query: request.query.clone(),
                    error: e.to_string(),
                });
                SearchResults::empty()
            }
        }
    }

    async fn rebuild_index(&self) -> SearchResult<RebuildReport> {
        let entities = self.store.list_entities(None).await?;
        tracing::info!(
            "Rebuilding cluster indices for namespace {} from {} entities",
            self.config.namespace,
            entities.len()
        );

        for entity_type in EntityType::ALL {
            let index = self.entity_index(entity_type);
            self.client.delete_index(&index).await?;
            self.ensure_entity_index(&index).await?;
        }

        let mut report = RebuildReport::default();
        for entity in &entities {
            match self.try_index_entity(entity, entity.is_enabled).await {
                Ok(()) => report.indexed += 1,
                Err(e) => {
                    report.failed += 1;
                    self.events.indexing_failed(
                        IndexOperation::Rebuild,
                        Some(entity.entity_type()),
                        &entity.path,
                        e,
                    );
                }
            }
        }
        Ok(report)
    }

    async fn document_count(&self) -> SearchResult<usize> {
        let counts = EntityType::ALL.map(|t| {
            let index = self.entity_index(t);
            async move { self.client.count(&index).await }
        });
        Ok(try_join_all(counts).await?.into_iter().sum())
    }
}

#[async_trait]
impl GroupRepository for ClusteredBackend {
    async fn upsert_group(&self, group: &ScopeGroup) -> SearchResult<()> {
        group.validate()?;
        let index = self.scopes_index();
        for (id, body) in split_group(group)? {
            self.client
                .put_document(&index, &id, &body, self.config.cluster.refresh)
                .await?;
        }
        tracing::debug!("Upserted group {}", group.name);
        Ok(())
    }

    async fn get_group(&self, name: &str) -> SearchResult<Option<ScopeGroup>> {
        let index = self.scopes_index();
        let reads = GroupFacet::ALL.map(|facet| {
            let index = index.clone();
            let id = facet.document_id(name);
            async move { self.client.get_document(&index, &id).await }
        });
        let documents = try_join_all(reads).await?;
        assemble_group(name, &documents)
    }

    async fn delete_group(&self, name: &str) -> SearchResult<bool> {
        let index = self.scopes_index();
        let mut existed = false;
        for facet in GroupFacet::ALL {
            existed |= self
                .client
                .delete_document(&index, &facet.document_id(name), self.config.cluster.refresh)
                .await?;
        }
        Ok(existed)
    }

    async fn list_groups(&self) -> SearchResult<Vec<ScopeGroup>> {
        let response = self
            .client
            .search(&self.scopes_index(), &query::group_mapping_query(MAX_LISTED_GROUPS), None)
            .await?;

        let mut groups = Vec::new();
        for (source, _) in query::hit_sources(&response)? {
            let Some(name) = mapping_group_name(&source) else {
                continue;
            };
            if let Some(group) = self.get_group(name).await? {
                groups.push(group);
            }
        }
        Ok(groups)
    }
}
