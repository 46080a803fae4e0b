//! Typed index events
//!
//! Index writes and searches fail open: the caller never sees the error.
//! Instead each outcome is published on an [`EventSink`], which keeps
//! running counters and fans events out to any subscribers.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use switchboard_core::EntityType;
use tokio::sync::broadcast;

/// Buffered events per subscriber before the slowest one starts lagging
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Which index mutation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOperation {
    Index,
    Remove,
    Rebuild,
    Group,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum IndexEvent {
    Indexed {
        entity_type: EntityType,
        path: String,
    },
    Removed {
        path: String,
    },
    IndexingFailed {
        operation: IndexOperation,
        entity_type: Option<EntityType>,
        path: String,
        error: String,
    },
    /// Written without a vector; searchable by keyword only
    EmbeddingDegraded {
        entity_type: EntityType,
        path: String,
        error: String,
    },
    SearchFailed {
        query: String,
        error: String,
    },
}

/// Snapshot of the sink's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventCounts {
    pub indexed: u64,
    pub removed: u64,
    pub indexing_failed: u64,
    pub embedding_degraded: u64,
    pub search_failed: u64,
}

impl EventCounts {
    pub fn failures(&self) -> u64 {
        self.indexing_failed + self.search_failed
    }
}

#[derive(Default)]
struct Counters {
    indexed: AtomicU64,
    removed: AtomicU64,
    indexing_failed: AtomicU64,
    embedding_degraded: AtomicU64,
    search_failed: AtomicU64,
}

/// Cheap to clone; clones share counters and subscribers
#[derive(Clone)]
pub struct EventSink {
    tx: broadcast::Sender<IndexEvent>,
    counters: Arc<Counters>,
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            tx,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IndexEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: IndexEvent) {
        let counter = match &event {
            IndexEvent::Indexed { .. } => &self.counters.indexed,
            IndexEvent::Removed { .. } => &self.counters.removed,
            IndexEvent::IndexingFailed { .. } => &self.counters.indexing_failed,
            IndexEvent::EmbeddingDegraded { .. } => &self.counters.embedding_degraded,
            IndexEvent::SearchFailed { .. } => &self.counters.search_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    pub fn counts(&self) -> EventCounts {
        EventCounts {
            indexed: self.counters.indexed.load(Ordering::Relaxed),
            removed: self.counters.removed.load(Ordering::Relaxed),
            indexing_failed: self.counters.indexing_failed.load(Ordering::Relaxed),
            embedding_degraded: self.counters.embedding_degraded.load(Ordering::Relaxed),
            search_failed: self.counters.search_failed.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn indexing_failed(
        &self,
        operation: IndexOperation,
        entity_type: Option<EntityType>,
        path: &str,
        error: impl ToString,
    ) {
        let error = error.to_string();
        tracing::warn!(
            ?operation,
            entity_type = ?entity_type,
            path,
            "Index update failed: {}",
            error
        );
        self.emit(IndexEvent::IndexingFailed {
            operation,
            entity_type,
            path: path.to_string(),
            error,
        });
    }
}
