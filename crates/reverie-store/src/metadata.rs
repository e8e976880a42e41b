//! Metadata table mapping document identifiers to their stored records.
//!
//! The table owns two maps that must never diverge: the forward map
//! `doc_id -> record` and the reverse map `position -> doc_id` used to
//! resolve search hits back to identifiers in O(1). Every mutation updates
//! both. A position present in the index but absent from the reverse map is
//! a tombstone and is invisible to retrieval.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reverie_core::error::ReverieError;

/// The stored metadata for one live document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Full document text as submitted.
    pub text: String,
    /// Ingestion timestamp, preserved across overwrites of other documents.
    pub timestamp: DateTime<Utc>,
    /// Position of the document's vector in the index.
    pub position: usize,
}

/// Forward and reverse lookup over live document metadata.
#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
    documents: HashMap<String, DocumentRecord>,
    positions: HashMap<usize, String>,
}

impl MetadataTable {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a table from a persisted forward map.
    ///
    /// Fails if two documents claim the same position; the loader treats
    /// that as a corrupt artifact.
    pub fn from_documents(
        documents: HashMap<String, DocumentRecord>,
    ) -> Result<Self, ReverieError> {
        let mut positions = HashMap::with_capacity(documents.len());
        for (doc_id, record) in &documents {
            if let Some(previous) = positions.insert(record.position, doc_id.clone()) {
                return Err(ReverieError::Persistence(format!(
                    "position {} claimed by both '{}' and '{}'",
                    record.position, previous, doc_id
                )));
            }
        }
        Ok(Self {
            documents,
            positions,
        })
    }

    /// The forward map, as persisted to the metadata artifact.
    pub fn documents(&self) -> &HashMap<String, DocumentRecord> {
        &self.documents
    }

    /// Insert or replace the entry for `doc_id`.
    ///
    /// Any prior entry is removed first, freeing its reverse-map slot; the
    /// old position becomes a tombstone. The table never holds two entries
    /// for the same identifier, and no two identifiers share a position.
    pub fn upsert(
        &mut self,
        doc_id: &str,
        text: &str,
        timestamp: DateTime<Utc>,
        position: usize,
    ) {
        self.remove(doc_id);
        self.documents.insert(
            doc_id.to_string(),
            DocumentRecord {
                text: text.to_string(),
                timestamp,
                position,
            },
        );
        self.positions.insert(position, doc_id.to_string());
    }

    /// Look up a live document by identifier.
    pub fn get(&self, doc_id: &str) -> Option<&DocumentRecord> {
        self.documents.get(doc_id)
    }

    /// Resolve an index position back to its live identifier.
    ///
    /// Returns `None` for tombstoned positions.
    pub fn resolve(&self, position: usize) -> Option<&str> {
        self.positions.get(&position).map(String::as_str)
    }

    /// Remove the entry for `doc_id`, returning it if it was live.
    ///
    /// The removed entry's position becomes a tombstone.
    pub fn remove(&mut self, doc_id: &str) -> Option<DocumentRecord> {
        let record = self.documents.remove(doc_id)?;
        self.positions.remove(&record.position);
        Some(record)
    }

    /// Number of live documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Return true if no documents are live.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Highest position recorded by any live document.
    pub fn max_position(&self) -> Option<usize> {
        self.documents.values().map(|r| r.position).max()
    }
}
