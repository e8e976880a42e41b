//! Document store facade coordinating the index, metadata, and persistence.
//!
//! The [`VectorIndex`] and [`MetadataTable`] form one consistency unit: a
//! vector's position must always agree with the position recorded for its
//! document. The store therefore owns both behind a single `RwLock`. All
//! mutations serialize on the write lock, which makes duplicate position
//! assignment impossible; reads take the read lock and may block briefly
//! behind a writer (no snapshot isolation; commit sections are in-memory
//! and short).
//!
//! The embedding call is the only slow operation on either path and always
//! happens before the lock is taken. Periodic saves clone the state under
//! the lock and write to disk outside it on a blocking thread.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use reverie_core::error::ReverieError;

use crate::embedding::{DynEmbeddingService, EmbeddingService};
use crate::index::VectorIndex;
use crate::metadata::{DocumentRecord, MetadataTable};
use crate::persistence::PersistenceManager;

/// Receipt returned by a successful store operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreReceipt {
    pub doc_id: String,
    /// Index position assigned to the document's vector.
    pub position: u64,
    /// Ingestion timestamp recorded in the metadata table.
    pub timestamp: DateTime<Utc>,
}

/// A ranked document returned by retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub doc_id: String,
    /// Full document text as originally submitted.
    pub text: String,
    /// Inner-product similarity against the query (higher is better).
    pub score: f64,
    /// Original ingestion timestamp, unchanged since store time.
    pub timestamp: DateTime<Utc>,
}

struct StoreState {
    index: VectorIndex,
    table: MetadataTable,
    /// Mutations committed since the last save.
    dirty_ops: u32,
}

/// Persistent vector document store.
///
/// Constructed once per process and shared by handle; there are no ambient
/// globals. Call [`DocumentStore::flush`] before shutdown to persist any
/// mutations since the last periodic save.
pub struct DocumentStore {
    inner: RwLock<StoreState>,
    embedder: Box<dyn DynEmbeddingService>,
    persistence: Arc<PersistenceManager>,
    save_interval: u32,
}

impl DocumentStore {
    /// Open a store, loading any persisted state from the manager's data
    /// directory. Missing or corrupt artifacts yield an empty store.
    pub fn open(
        persistence: PersistenceManager,
        embedder: impl EmbeddingService + 'static,
        save_interval: u32,
    ) -> Self {
        Self::open_dyn(persistence, Box::new(embedder), save_interval)
    }

    /// Open a store from a pre-boxed dynamic embedding service.
    pub fn open_dyn(
        persistence: PersistenceManager,
        embedder: Box<dyn DynEmbeddingService>,
        save_interval: u32,
    ) -> Self {
        let (index, table) = persistence.load(embedder.dimensions());
        info!(
            vectors = index.len(),
            documents = table.len(),
            dimension = embedder.dimensions(),
            "Document store opened"
        );
        Self {
            inner: RwLock::new(StoreState {
                index,
                table,
                dirty_ops: 0,
            }),
            embedder,
            persistence: Arc::new(persistence),
            save_interval,
        }
    }

    /// Store a document under `doc_id`, replacing any prior document with
    /// the same identifier.
    ///
    /// The replaced document's vector stays in the index as a tombstone;
    /// the index structure supports no in-place deletion. Fails with
    /// `EmptyDocument` before any model call if the text is blank, and with
    /// `Embedding` if the model service errors; neither failure commits
    /// any state.
    pub async fn store(&self, doc_id: &str, text: &str) -> Result<StoreReceipt, ReverieError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ReverieError::EmptyDocument);
        }

        // Embed outside the lock; this is the long pole of the operation.
        let embedding = self.embedder.embed_boxed(text).await?;
        let timestamp = Utc::now();

        let (position, snapshot) = {
            let mut state = self.write_state()?;
            let position = state.index.add(&embedding)?;
            state.table.upsert(doc_id, text, timestamp, position);
            let snapshot = Self::take_due_snapshot(&mut state, self.save_interval);
            (position, snapshot)
        };

        debug!(doc_id, position, "Document stored");
        self.spawn_save(snapshot).await;

        Ok(StoreReceipt {
            doc_id: doc_id.to_string(),
            position: position as u64,
            timestamp,
        })
    }

    /// Retrieve up to `top_k` documents ranked by similarity to `query`.
    ///
    /// Degrades to an empty result on an empty index or an embedding
    /// failure. Retrieval problems must not surface as request errors;
    /// callers proceed with an empty context.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Vec<RetrievedDocument> {
        if top_k == 0 || query.trim().is_empty() {
            return Vec::new();
        }

        let embedding = match self.embedder.embed_boxed(query).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Query embedding failed; returning no context");
                return Vec::new();
            }
        };

        let state = match self.inner.read() {
            Ok(state) => state,
            Err(e) => {
                error!(error = %e, "Store lock poisoned during retrieval");
                return Vec::new();
            }
        };
        if state.index.is_empty() {
            return Vec::new();
        }

        // Over-fetch to absorb tombstones the index cannot see.
        let fetch = (top_k * 2).max(top_k + 5);
        let hits = match state.index.search(&embedding, fetch) {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "Index search failed; returning no context");
                return Vec::new();
            }
        };

        let mut results = Vec::with_capacity(top_k);
        let mut seen: HashSet<String> = HashSet::new();
        for hit in hits {
            // Tombstoned positions resolve to nothing and are skipped.
            let Some(doc_id) = state.table.resolve(hit.position) else {
                continue;
            };
            // A position maps to at most one live document, so duplicates
            // indicate a broken invariant; skip rather than repeat.
            if !seen.insert(doc_id.to_string()) {
                continue;
            }
            let Some(record) = state.table.get(doc_id) else {
                continue;
            };
            results.push(RetrievedDocument {
                doc_id: doc_id.to_string(),
                text: record.text.clone(),
                score: hit.score,
                timestamp: record.timestamp,
            });
            if results.len() >= top_k {
                break;
            }
        }
        results
    }

    /// Look up a live document by identifier.
    pub fn get(&self, doc_id: &str) -> Result<DocumentRecord, ReverieError> {
        let state = self.read_state()?;
        state
            .table
            .get(doc_id)
            .cloned()
            .ok_or_else(|| ReverieError::NotFound(doc_id.to_string()))
    }

    /// Logically delete a document. Its vector remains in the index as a
    /// tombstone.
    pub async fn delete(&self, doc_id: &str) -> Result<(), ReverieError> {
        let snapshot = {
            let mut state = self.write_state()?;
            if state.table.remove(doc_id).is_none() {
                return Err(ReverieError::NotFound(doc_id.to_string()));
            }
            Self::take_due_snapshot(&mut state, self.save_interval)
        };

        debug!(doc_id, "Document deleted");
        self.spawn_save(snapshot).await;
        Ok(())
    }

    /// Persist the current state unconditionally. Called on graceful
    /// shutdown and whenever the caller needs durability now.
    pub async fn flush(&self) -> Result<(), ReverieError> {
        let (index, table) = {
            let mut state = self.write_state()?;
            state.dirty_ops = 0;
            (state.index.clone(), state.table.clone())
        };
        let persistence = Arc::clone(&self.persistence);
        tokio::task::spawn_blocking(move || persistence.save(&index, &table))
            .await
            .map_err(|e| ReverieError::Store(format!("flush task panicked: {}", e)))?
    }

    /// Number of live documents.
    pub fn document_count(&self) -> usize {
        self.inner.read().map(|s| s.table.len()).unwrap_or(0)
    }

    /// Total vectors in the index, tombstones included.
    pub fn index_len(&self) -> usize {
        self.inner.read().map(|s| s.index.len()).unwrap_or(0)
    }

    fn write_state(&self) -> Result<std::sync::RwLockWriteGuard<'_, StoreState>, ReverieError> {
        self.inner
            .write()
            .map_err(|e| ReverieError::Store(format!("lock poisoned: {}", e)))
    }

    fn read_state(&self) -> Result<std::sync::RwLockReadGuard<'_, StoreState>, ReverieError> {
        self.inner
            .read()
            .map_err(|e| ReverieError::Store(format!("lock poisoned: {}", e)))
    }

    /// Count a committed mutation and clone the state for saving when the
    /// interval is reached. Must be called with the write lock held.
    fn take_due_snapshot(
        state: &mut StoreState,
        save_interval: u32,
    ) -> Option<(VectorIndex, MetadataTable)> {
        state.dirty_ops += 1;
        if state.dirty_ops >= save_interval {
            state.dirty_ops = 0;
            Some((state.index.clone(), state.table.clone()))
        } else {
            None
        }
    }

    /// Write a snapshot on a blocking thread, outside the store lock.
    ///
    /// A failed periodic save is logged, not propagated: the mutation it
    /// follows has already committed, and the next save retries everything.
    async fn spawn_save(&self, snapshot: Option<(VectorIndex, MetadataTable)>) {
        let Some((index, table)) = snapshot else {
            return;
        };
        let persistence = Arc::clone(&self.persistence);
        let result = tokio::task::spawn_blocking(move || persistence.save(&index, &table)).await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Periodic save failed"),
            Err(e) => error!(error = %e, "Periodic save task panicked"),
        }
    }
}
