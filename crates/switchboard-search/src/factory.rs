//! Repository registry: one memoized backend per process

use redb::Database;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use switchboard_storage::EntityStore;
use tokio::sync::Mutex;

use crate::backend::SearchBackend;
use crate::config::{BackendKind, SearchConfig};
use crate::embedded::EmbeddedBackend;
use crate::error::{SearchError, SearchResult};
use crate::events::EventSink;
use crate::traits::{RebuildReport, SearchRepository};

struct Memoized {
    kind: BackendKind,
    backend: Arc<SearchBackend>,
    initialized: bool,
}

#[derive(Default)]
struct Slot {
    backend: Option<Memoized>,
    /// Embedded index file, kept open across resets and shared by every
    /// backend built over the same data dir
    index_file: Option<(PathBuf, Arc<Database>)>,
}

/// Builds the configured backend on first use and hands out the same
/// instance until [`reset`](Self::reset).
///
/// Construct one per process and share it behind an `Arc`.
pub struct RepositoryRegistry {
    config: RwLock<SearchConfig>,
    store: Arc<dyn EntityStore>,
    events: EventSink,
    slot: Mutex<Slot>,
}

impl RepositoryRegistry {
    pub fn new(config: SearchConfig, store: Arc<dyn EntityStore>) -> Self {
        Self::with_events(config, store, EventSink::new())
    }

    pub fn with_events(config: SearchConfig, store: Arc<dyn EntityStore>, events: EventSink) -> Self {
        Self {
            config: RwLock::new(config),
            store,
            events,
            slot: Mutex::new(Slot::default()),
        }
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub fn config(&self) -> SearchResult<SearchConfig> {
        self.config
            .read()
            .map(|c| c.clone())
            .map_err(|e| SearchError::Internal(format!("Lock error: {}", e)))
    }

    /// Replace the configuration. The memoized backend is kept until the
    /// next [`repository`](Self::repository) call notices a kind change,
    /// or until [`reset`](Self::reset).
    pub fn set_config(&self, config: SearchConfig) -> SearchResult<()> {
        let mut current = self
            .config
            .write()
            .map_err(|e| SearchError::Internal(format!("Lock error: {}", e)))?;
        *current = config;
        Ok(())
    }

    /// The memoized backend, built and initialized if needed.
    ///
    /// Configuration errors from `initialize` are returned. Other
    /// initialization failures (an unreachable cluster) are logged and
    /// retried on the next call; the backend is still handed out so that
    /// searches fail open.
    pub async fn repository(&self) -> SearchResult<Arc<SearchBackend>> {
        let mut slot = self.slot.lock().await;
        let mut current = self.memoized(&mut slot)?;

        if !current.initialized {
            match current.backend.initialize().await {
                Ok(()) => current.initialized = true,
                Err(e @ SearchError::Configuration(_)) => return Err(e),
                Err(e) => tracing::warn!(
                    "Search backend {} could not be initialized, retrying on next use: {}",
                    current.kind,
                    e
                ),
            }
        }

        let backend = Arc::clone(&current.backend);
        slot.backend = Some(current);
        Ok(backend)
    }

    /// Rebuild the index from the primary store, then initialize.
    ///
    /// Skips the up-front `initialize`, so an index that `repository`
    /// rejects (wrong dimension or mapping) can still be recovered.
    pub async fn rebuild_index(&self) -> SearchResult<RebuildReport> {
        let backend = {
            let mut slot = self.slot.lock().await;
            let current = self.memoized(&mut slot)?;
            let backend = Arc::clone(&current.backend);
            slot.backend = Some(current);
            backend
        };
        let report = backend.rebuild_index().await?;
        self.repository().await?;
        Ok(report)
    }

    /// Take the memoized backend out of `slot` if it still matches the
    /// configuration, otherwise build a new one
    fn memoized(&self, slot: &mut Slot) -> SearchResult<Memoized> {
        let config = self.config()?;
        let wanted = config.backend_kind();

        match slot.backend.take() {
            Some(current) if current.kind == wanted => return Ok(current),
            Some(stale) => tracing::warn!(
                "Search backend changed from {} to {} without a reset; rebuilding",
                stale.kind,
                wanted
            ),
            None => {}
        }

        let index_file = Self::shared_index_file(&mut slot.index_file, &config)?;
        let backend = SearchBackend::with_index_file(config, Arc::clone(&self.store), self.events.clone(), index_file)?;
        Ok(Memoized {
            kind: wanted,
            backend: Arc::new(backend),
            initialized: false,
        })
    }

    fn shared_index_file(
        cache: &mut Option<(PathBuf, Arc<Database>)>,
        config: &SearchConfig,
    ) -> SearchResult<Option<Arc<Database>>> {
        if config.backend_kind() != BackendKind::Embedded {
            return Ok(None);
        }
        let Some(dir) = &config.data_dir else {
            return Ok(None);
        };
        if let Some((path, db)) = cache.as_ref() {
            if path == dir {
                return Ok(Some(Arc::clone(db)));
            }
        }

        let db = EmbeddedBackend::open_database(dir)?;
        *cache = Some((dir.clone(), Arc::clone(&db)));
        Ok(Some(db))
    }

    /// Drop the memoized backend; the next call builds a fresh one
    pub async fn reset(&self) {
        if self.slot.lock().await.backend.take().is_some() {
            tracing::debug!("Search repository reset");
        }
    }
}
