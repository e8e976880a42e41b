//! Reverie store crate - vector index, metadata table, persistence, and the
//! document store facade.
//!
//! Provides an append-only vector index with exact inner-product search, a
//! metadata table with forward and reverse identifier lookup, atomic disk
//! persistence for both, the embedding service trait with a mock
//! implementation for testing, and the `DocumentStore` facade that keeps the
//! whole triple consistent under concurrent use.

pub mod embedding;
pub mod index;
pub mod metadata;
pub mod persistence;
pub mod store;

pub use embedding::{DynEmbeddingService, EmbeddingService, MockEmbedding};
pub use index::{SearchHit, VectorIndex};
pub use metadata::{DocumentRecord, MetadataTable};
pub use persistence::PersistenceManager;
pub use store::{DocumentStore, RetrievedDocument, StoreReceipt};
