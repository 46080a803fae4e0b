//! Embedded backend
//!
//! Exact cosine scan over an in-memory map of index documents. When a data
//! directory is configured, documents are also written through to
//! `<data_dir>/search-index.redb`, one table per physical index name.
//! There is no keyword channel: ranking is by vector similarity alone.

use async_trait::async_trait;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, RwLock};
use switchboard_core::{document_id, normalize_path, Entity, EntityType, ScopeGroup, SearchRequest, SearchResults};
use switchboard_storage::EntityStore;

use crate::config::SearchConfig;
use crate::document::{IndexDocument, IndexFamily};
use crate::embedding::EmbeddingProvider;
use crate::error::{SearchError, SearchResult};
use crate::events::{EventSink, IndexEvent, IndexOperation};
use crate::groups::{assemble_group, mapping_group_name, split_group, GroupFacet};
use crate::ranking::{assemble_results, cosine_similarity, ScoredDocument};
use crate::traits::{GroupRepository, RebuildReport, SearchRepository};

pub const INDEX_FILE_NAME: &str = "search-index.redb";

type DocKey = (EntityType, String);

fn lock_error(e: impl std::fmt::Display) -> SearchError {
    SearchError::Internal(format!("Lock error: {}", e))
}

fn table_def(name: &str) -> TableDefinition<'_, &'static str, &'static [u8]> {
    TableDefinition::new(name)
}

/// Single-process vector index
pub struct EmbeddedBackend {
    config: SearchConfig,
    store: Arc<dyn EntityStore>,
    provider: Arc<dyn EmbeddingProvider>,
    events: EventSink,
    db: Option<Arc<Database>>,
    documents: RwLock<HashMap<DocKey, IndexDocument>>,
    groups: RwLock<BTreeMap<String, Value>>,
}

impl EmbeddedBackend {
    /// Open the backend, and its index file when a data dir is configured.
    /// Persisted documents are loaded here; their dimension is checked by
    /// [`initialize`](SearchRepository::initialize).
    pub fn new(
        config: SearchConfig,
        store: Arc<dyn EntityStore>,
        provider: Arc<dyn EmbeddingProvider>,
        events: EventSink,
    ) -> SearchResult<Self> {
        let db = match &config.data_dir {
            Some(dir) => Some(Self::open_database(dir)?),
            None => None,
        };
        Self::with_database(config, store, provider, events, db)
    }

    /// Build over an index file that is already open, so several backend
    /// instances can share one redb handle
    pub fn with_database(
        config: SearchConfig,
        store: Arc<dyn EntityStore>,
        provider: Arc<dyn EmbeddingProvider>,
        events: EventSink,
        db: Option<Arc<Database>>,
    ) -> SearchResult<Self> {
        let backend = Self {
            config,
            store,
            provider,
            events,
            db,
            documents: RwLock::new(HashMap::new()),
            groups: RwLock::new(BTreeMap::new()),
        };
        backend.load()?;
        Ok(backend)
    }

    /// Open `<dir>/search-index.redb`, creating the directory if needed
    pub fn open_database(dir: &Path) -> SearchResult<Arc<Database>> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(INDEX_FILE_NAME);
        let db = Database::create(&path)?;
        tracing::debug!("Opened embedded search index at {:?}", path);
        Ok(Arc::new(db))
    }

    pub fn is_persistent(&self) -> bool {
        self.db.is_some()
    }

    fn entity_table_name(&self, entity_type: EntityType) -> String {
        self.config.index_name(IndexFamily::for_entity(entity_type))
    }

    fn scopes_table_name(&self) -> String {
        self.config.index_name(IndexFamily::Scopes)
    }

    /// Read every table of this namespace into memory
    fn load(&self) -> SearchResult<()> {
        let Some(db) = &self.db else {
            return Ok(());
        };

        self.create_tables(db)?;
        let read_txn = db.begin_read()?;

        let mut documents = HashMap::new();
        for entity_type in EntityType::ALL {
            let name = self.entity_table_name(entity_type);
            let table = read_txn.open_table(table_def(&name))?;
            for entry in table.iter()? {
                let (key, value) = entry?;
                let doc: IndexDocument = serde_json::from_slice(value.value())?;
                documents.insert((entity_type, key.value().to_string()), doc);
            }
        }

        let mut groups = BTreeMap::new();
        let name = self.scopes_table_name();
        let scopes = read_txn.open_table(table_def(&name))?;
        for entry in scopes.iter()? {
            let (key, value) = entry?;
            groups.insert(key.value().to_string(), serde_json::from_slice(value.value())?);
        }

        tracing::debug!("Loaded {} indexed documents", documents.len());
        *self.documents.write().map_err(lock_error)? = documents;
        *self.groups.write().map_err(lock_error)? = groups;
        Ok(())
    }

    fn create_tables(&self, db: &Database) -> SearchResult<()> {
        let write_txn = db.begin_write()?;
        {
            for entity_type in EntityType::ALL {
                write_txn.open_table(table_def(&self.entity_table_name(entity_type)))?;
            }
            write_txn.open_table(table_def(&self.scopes_table_name()))?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn persist(&self, table_name: &str, id: &str, value: &[u8]) -> SearchResult<()> {
        let Some(db) = &self.db else {
            return Ok(());
        };
        let write_txn = db.begin_write()?;
        {
            let mut t = write_txn.open_table(table_def(table_name))?;
            t.insert(id, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn unpersist(&self, table_name: &str, id: &str) -> SearchResult<()> {
        let Some(db) = &self.db else {
            return Ok(());
        };
        let write_txn = db.begin_write()?;
        {
            let mut t = write_txn.open_table(table_def(table_name))?;
            t.remove(id)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Empty the entity tables, leaving groups alone
    fn clear_entities(&self) -> SearchResult<()> {
        if let Some(db) = &self.db {
            let write_txn = db.begin_write()?;
            for entity_type in EntityType::ALL {
                let name = self.entity_table_name(entity_type);
                write_txn.delete_table(table_def(&name))?;
                write_txn.open_table(table_def(&name))?;
            }
            write_txn.commit()?;
        }
        self.documents.write().map_err(lock_error)?.clear();
        Ok(())
    }

    fn try_remove(&self, entity_types: &[EntityType], path: &str) -> SearchResult<bool> {
        let id = document_id(&normalize_path(path)?);
        let mut existed = false;
        for &entity_type in entity_types {
            self.unpersist(&self.entity_table_name(entity_type), &id)?;
            let removed = self
                .documents
                .write()
                .map_err(lock_error)?
                .remove(&(entity_type, id.clone()));
            existed |= removed.is_some();
        }
        Ok(existed)
    }

    async fn try_search(&self, request: &SearchRequest) -> SearchResult<SearchResults> {
        let query_vector = self.provider.encode_one(&request.query).await?;

        let candidates: Vec<ScoredDocument> = {
            let documents = self.documents.read().map_err(lock_error)?;
            documents
                .values()
                .filter(|doc| request.wants(doc.entity_type))
                .filter(|doc| !request.enabled_only || doc.is_enabled)
                .filter_map(|doc| {
                    let embedding = doc.embedding.as_ref()?;
                    let score = cosine_similarity(&query_vector, embedding);
                    (score > 0.0).then(|| ScoredDocument {
                        document: doc.clone(),
                        score,
                    })
                })
                .collect()
        };

        Ok(assemble_results(request, candidates))
    }

    fn remove_from(&self, entity_types: &[EntityType], failed_type: Option<EntityType>, path: &str) {
        match self.try_remove(entity_types, path) {
            Ok(true) => self.events.emit(IndexEvent::Removed {
                path: path.to_string(),
            }),
            Ok(false) => tracing::debug!("No indexed document at {}", path),
            Err(e) => self
                .events
                .indexing_failed(IndexOperation::Remove, failed_type, path, e),
        }
    }

    fn group_documents(&self, name: &str) -> SearchResult<Vec<Option<Value>>> {
        let groups = self.groups.read().map_err(lock_error)?;
        Ok(GroupFacet::ALL
            .iter()
            .map(|facet| groups.get(&facet.document_id(name)).cloned())
            .collect())
    }
}

#[async_trait]
impl SearchRepository for EmbeddedBackend {
    async fn initialize(&self) -> SearchResult<()> {
        if let Some(db) = &self.db {
            self.create_tables(db)?;
        }

        let expected = self.provider.dimension();
        let documents = self.documents.read().map_err(lock_error)?;
        if let Some(doc) = documents.values().find(|d| d.check_dimension(expected).is_err()) {
            return Err(SearchError::Configuration(format!(
                "persisted index has embeddings of dimension {} but the provider produces {}; run a rebuild",
                doc.embedding.as_ref().map_or(0, Vec::len),
                expected
            )));
        }

        tracing::info!(
            "Embedded search index ready: {} documents in namespace {}",
            documents.len(),
            self.config.namespace
        );
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
        let doc = IndexDocument::from_entity(entity, is_enabled)?;

        // No keyword channel to fall back to, whatever the policy
        let embedding = self.provider.encode_one(&doc.text_for_embedding).await?;
        let doc = doc.with_embedding(embedding);
        doc.check_dimension(self.provider.dimension())?;

        let id = doc.id();
        self.persist(
            &self.entity_table_name(doc.entity_type),
            &id,
            &serde_json::to_vec(&doc)?,
        )?;

        tracing::debug!("Indexed {} {}", doc.entity_type, doc.path);
        self.documents
            .write()
            .map_err(lock_error)?
            .insert((doc.entity_type, id), doc);
        Ok(())
    }

    async fn remove_entity(&self, path: &str) {
        self.remove_from(&EntityType::ALL, None, path);
    }

    async fn remove_entity_of(&self, entity_type: EntityType, path: &str) {
        self.remove_from(&[entity_type], Some(entity_type), path);
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
        tracing::info!("Rebuilding embedded index from {} entities", entities.len());
        self.clear_entities()?;

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
        if let Some(db) = &self.db {
            let read_txn = db.begin_read()?;
            let mut total = 0;
            for entity_type in EntityType::ALL {
                let name = self.entity_table_name(entity_type);
                total += read_txn.open_table(table_def(&name))?.len()? as usize;
            }
            return Ok(total);
        }
        Ok(self.documents.read().map_err(lock_error)?.len())
    }
}

#[async_trait]
impl GroupRepository for EmbeddedBackend {
    async fn upsert_group(&self, group: &ScopeGroup) -> SearchResult<()> {
        group.validate()?;
        let table_name = self.scopes_table_name();
        for (id, value) in split_group(group)? {
            self.persist(&table_name, &id, &serde_json::to_vec(&value)?)?;
            self.groups.write().map_err(lock_error)?.insert(id, value);
        }
        Ok(())
    }

    async fn get_group(&self, name: &str) -> SearchResult<Option<ScopeGroup>> {
        assemble_group(name, &self.group_documents(name)?)
    }

    async fn delete_group(&self, name: &str) -> SearchResult<bool> {
        let table_name = self.scopes_table_name();
        let mut existed = false;
        for facet in GroupFacet::ALL {
            let id = facet.document_id(name);
            self.unpersist(&table_name, &id)?;
            existed |= self.groups.write().map_err(lock_error)?.remove(&id).is_some();
        }
        Ok(existed)
    }

    async fn list_groups(&self) -> SearchResult<Vec<ScopeGroup>> {
        let names: Vec<String> = {
            let groups = self.groups.read().map_err(lock_error)?;
            groups
                .values()
                .filter_map(mapping_group_name)
                .map(str::to_string)
                .collect()
        };

        let mut result = Vec::with_capacity(names.len());
        for name in names {
            if let Some(group) = self.get_group(&name).await? {
                result.push(group);
            }
        }
        Ok(result)
    }
}
