//! Disk persistence for the vector index and metadata table.
//!
//! Two artifacts live in the data directory:
//! - `index.rvx`: bincode-serialized [`VectorIndex`] followed by a magic
//!   marker and a CRC32 footer for integrity verification.
//! - `documents.json`: the `doc_id -> record` map as pretty-printed JSON,
//!   readable for offline inspection and backup.
//!
//! Writes are atomic (temp file + rename). The index is renamed into place
//! before the metadata: the index is append-only, so a crash between the two
//! renames leaves a new index with old metadata, whose positions are still a
//! valid prefix of the index. The reverse order could leave metadata
//! referencing positions beyond the end of the index.
//!
//! Loading is availability-over-durability: a missing, unparseable, or
//! mutually inconsistent pair of artifacts yields an empty store with a
//! logged warning rather than a startup failure.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use reverie_core::error::ReverieError;

use crate::index::VectorIndex;
use crate::metadata::{DocumentRecord, MetadataTable};

/// File name of the serialized vector index.
pub const INDEX_FILE: &str = "index.rvx";
/// File name of the document metadata record.
pub const DOCUMENTS_FILE: &str = "documents.json";

/// Magic bytes preceding the CRC32 footer on the index artifact.
const INDEX_MAGIC: &[u8; 4] = b"RVX1";

/// Reads and writes the persisted store artifacts in one data directory.
///
/// Owns the on-disk files exclusively; no other component touches them.
#[derive(Debug, Clone)]
pub struct PersistenceManager {
    dir: PathBuf,
}

impl PersistenceManager {
    /// Create a manager rooted at the given data directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The data directory this manager owns.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load the index and metadata from disk.
    ///
    /// Never fails: any missing, corrupt, or inconsistent artifact falls
    /// back to an empty store, logging the data loss. `dimension` is the
    /// configured embedding dimension a loaded index must match.
    pub fn load(&self, dimension: usize) -> (VectorIndex, MetadataTable) {
        let index = match self.load_index(dimension) {
            Ok(Some(index)) => index,
            Ok(None) => {
                info!("No index artifact found; starting with an empty store");
                return (VectorIndex::new(dimension), MetadataTable::new());
            }
            Err(e) => {
                warn!(error = %e, "Index artifact unreadable; starting with an empty store");
                return (VectorIndex::new(dimension), MetadataTable::new());
            }
        };

        let table = match self.load_documents() {
            Ok(Some(documents)) => match MetadataTable::from_documents(documents) {
                Ok(table) => table,
                Err(e) => {
                    warn!(error = %e, "Metadata artifact inconsistent; discarding stored state");
                    return (VectorIndex::new(dimension), MetadataTable::new());
                }
            },
            // A present index with absent metadata is consistent: every
            // position is simply a tombstone.
            Ok(None) => MetadataTable::new(),
            Err(e) => {
                warn!(error = %e, "Metadata artifact unreadable; discarding stored state");
                return (VectorIndex::new(dimension), MetadataTable::new());
            }
        };

        // Cross-artifact check: metadata may only reference positions the
        // index actually holds.
        if let Some(max) = table.max_position() {
            if max >= index.len() {
                warn!(
                    max_position = max,
                    index_len = index.len(),
                    "Metadata references positions beyond the index; discarding stored state"
                );
                return (VectorIndex::new(dimension), MetadataTable::new());
            }
        }

        info!(
            vectors = index.len(),
            documents = table.len(),
            "Loaded store from {}",
            self.dir.display()
        );
        (index, table)
    }

    /// Write both artifacts atomically.
    pub fn save(&self, index: &VectorIndex, table: &MetadataTable) -> Result<(), ReverieError> {
        fs::create_dir_all(&self.dir)?;

        let payload = bincode::serialize(index)
            .map_err(|e| ReverieError::Persistence(format!("index serialization: {}", e)))?;
        let crc = crc32fast::hash(&payload);

        let mut index_bytes = Vec::with_capacity(payload.len() + 8);
        index_bytes.extend_from_slice(&payload);
        index_bytes.extend_from_slice(INDEX_MAGIC);
        index_bytes.extend_from_slice(&crc.to_be_bytes());

        let documents_bytes = serde_json::to_vec_pretty(table.documents())?;

        let index_path = self.dir.join(INDEX_FILE);
        let index_tmp = self.dir.join(format!("{}.tmp", INDEX_FILE));
        let documents_path = self.dir.join(DOCUMENTS_FILE);
        let documents_tmp = self.dir.join(format!("{}.tmp", DOCUMENTS_FILE));

        fs::write(&index_tmp, &index_bytes)?;
        fs::write(&documents_tmp, &documents_bytes)?;

        // Index first; see the module docs for why this order is crash-safe.
        fs::rename(&index_tmp, &index_path)?;
        fs::rename(&documents_tmp, &documents_path)?;

        info!(
            vectors = index.len(),
            documents = table.len(),
            "Saved store to {}",
            self.dir.display()
        );
        Ok(())
    }

    fn load_index(&self, dimension: usize) -> Result<Option<VectorIndex>, ReverieError> {
        let path = self.dir.join(INDEX_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read(&path)?;

        if raw.len() < 8 || &raw[raw.len() - 8..raw.len() - 4] != INDEX_MAGIC {
            return Err(ReverieError::Persistence(format!(
                "{} is truncated or missing its integrity footer",
                path.display()
            )));
        }
        let payload = &raw[..raw.len() - 8];
        let stored_crc = u32::from_be_bytes([
            raw[raw.len() - 4],
            raw[raw.len() - 3],
            raw[raw.len() - 2],
            raw[raw.len() - 1],
        ]);
        let computed_crc = crc32fast::hash(payload);
        if computed_crc != stored_crc {
            return Err(ReverieError::Persistence(format!(
                "CRC32 mismatch in {}: stored {:#010x}, computed {:#010x}",
                path.display(),
                stored_crc,
                computed_crc
            )));
        }

        let index: VectorIndex = bincode::deserialize(payload)
            .map_err(|e| ReverieError::Persistence(format!("index deserialization: {}", e)))?;

        if index.dimension() != dimension {
            return Err(ReverieError::Persistence(format!(
                "index dimension {} does not match configured dimension {}",
                index.dimension(),
                dimension
            )));
        }

        Ok(Some(index))
    }

    fn load_documents(
        &self,
    ) -> Result<Option<HashMap<String, DocumentRecord>>, ReverieError> {
        let path = self.dir.join(DOCUMENTS_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read(&path)?;
        let documents: HashMap<String, DocumentRecord> = serde_json::from_slice(&raw)?;
        Ok(Some(documents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const DIM: usize = 4;

    fn populated() -> (VectorIndex, MetadataTable) {
        let mut index = VectorIndex::new(DIM);
        let mut table = MetadataTable::new();
        for (i, doc_id) in ["doc1", "doc2", "doc3"].iter().enumerate() {
            let mut v = vec![0.0f32; DIM];
            v[i] = 1.0;
            let position = index.add(&v).unwrap();
            table.upsert(doc_id, &format!("text {}", i), Utc::now(), position);
        }
        (index, table)
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = PersistenceManager::new(dir.path());
        let (index, table) = populated();

        manager.save(&index, &table).unwrap();
        let (loaded_index, loaded_table) = manager.load(DIM);

        assert_eq!(loaded_index.len(), 3);
        assert_eq!(loaded_table.len(), 3);
        assert_eq!(loaded_table.resolve(0), Some("doc1"));
        assert_eq!(
            loaded_table.get("doc2").unwrap().text,
            table.get("doc2").unwrap().text
        );
    }

    #[test]
    fn test_load_missing_dir_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manager = PersistenceManager::new(dir.path().join("never-created"));
        let (index, table) = manager.load(DIM);
        assert!(index.is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn test_load_corrupt_index_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manager = PersistenceManager::new(dir.path());
        let (index, table) = populated();
        manager.save(&index, &table).unwrap();

        // Flip a payload byte; the CRC check must reject the file.
        let path = dir.path().join(INDEX_FILE);
        let mut bytes = fs::read(&path).unwrap();
        bytes[4] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();

        let (index, table) = manager.load(DIM);
        assert!(index.is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn test_load_truncated_index_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manager = PersistenceManager::new(dir.path());
        fs::write(dir.path().join(INDEX_FILE), b"abc").unwrap();

        let (index, table) = manager.load(DIM);
        assert!(index.is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn test_load_corrupt_metadata_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manager = PersistenceManager::new(dir.path());
        let (index, table) = populated();
        manager.save(&index, &table).unwrap();

        fs::write(dir.path().join(DOCUMENTS_FILE), b"{ not json").unwrap();

        let (index, table) = manager.load(DIM);
        assert!(index.is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn test_load_metadata_beyond_index_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manager = PersistenceManager::new(dir.path());
        let (index, mut table) = populated();
        // Record a position the index does not hold.
        table.upsert("phantom", "text", Utc::now(), 99);
        manager.save(&index, &table).unwrap();

        let (index, table) = manager.load(DIM);
        assert!(index.is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn test_load_wrong_dimension_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manager = PersistenceManager::new(dir.path());
        let (index, table) = populated();
        manager.save(&index, &table).unwrap();

        let (index, table) = manager.load(DIM + 1);
        assert!(index.is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn test_index_without_metadata_is_all_tombstones() {
        let dir = tempfile::tempdir().unwrap();
        let manager = PersistenceManager::new(dir.path());
        let (index, table) = populated();
        manager.save(&index, &table).unwrap();

        fs::remove_file(dir.path().join(DOCUMENTS_FILE)).unwrap();

        let (index, table) = manager.load(DIM);
        assert_eq!(index.len(), 3);
        assert!(table.is_empty());
    }

    #[test]
    fn test_documents_artifact_is_plain_json() {
        let dir = tempfile::tempdir().unwrap();
        let manager = PersistenceManager::new(dir.path());
        let (index, table) = populated();
        manager.save(&index, &table).unwrap();

        // The metadata record must be independently parseable.
        let raw = fs::read(dir.path().join(DOCUMENTS_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert!(value.get("doc1").is_some());
        assert!(value["doc1"].get("position").is_some());
        assert!(value["doc1"].get("timestamp").is_some());
    }

    #[test]
    fn test_save_overwrites_previous_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let manager = PersistenceManager::new(dir.path());
        let (index, table) = populated();
        manager.save(&index, &table).unwrap();

        let mut bigger = index.clone();
        let mut bigger_table = table.clone();
        let position = bigger.add(&[0.5; DIM]).unwrap();
        bigger_table.upsert("doc4", "more text", Utc::now(), position);
        manager.save(&bigger, &bigger_table).unwrap();

        let (loaded_index, loaded_table) = manager.load(DIM);
        assert_eq!(loaded_index.len(), 4);
        assert_eq!(loaded_table.len(), 4);
    }
}
