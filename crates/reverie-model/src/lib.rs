//! Reverie model crate - HTTP adapters for the external embedding and
//! generation services, with an identical-text embedding cache.

pub mod cache;
pub mod ollama;

pub use cache::EmbeddingCache;
pub use ollama::OllamaClient;
