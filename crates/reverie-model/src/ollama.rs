//! HTTP client for an Ollama-compatible model server.
//!
//! Implements both external service adapters: `EmbeddingService` (POST
//! /api/embeddings) and `GenerationService` (POST /api/generate). Every
//! request carries a bounded timeout so a hung service surfaces as a typed
//! failure instead of stalling the caller. Embedding responses are
//! dimension-checked before a vector can reach the store.

use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use reverie_chat::generation::GenerationService;
use reverie_core::config::ModelConfig;
use reverie_core::error::ReverieError;
use reverie_store::embedding::EmbeddingService;

use crate::cache::EmbeddingCache;

/// Client for the external embedding and generation endpoints.
pub struct OllamaClient {
    http: reqwest::Client,
    config: ModelConfig,
    cache: Mutex<EmbeddingCache>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f64,
    num_ctx: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    /// Build a client from the model configuration.
    pub fn new(config: ModelConfig) -> Result<Self, ReverieError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ReverieError::Config(format!("HTTP client: {}", e)))?;
        let cache = Mutex::new(EmbeddingCache::new(config.embed_cache_capacity));
        Ok(Self {
            http,
            config,
            cache,
        })
    }

    /// The configured embedding dimension.
    pub fn embedding_dim(&self) -> usize {
        self.config.embedding_dim
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, ReverieError> {
        if let Some(cached) = self.cache.lock().ok().and_then(|c| c.get(text).cloned()) {
            debug!(chars = text.len(), "Embedding cache hit");
            return Ok(cached);
        }

        let url = format!("{}/api/embeddings", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .timeout(Duration::from_secs(self.config.embed_timeout_secs))
            .json(&EmbeddingRequest {
                model: &self.config.embed_model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| ReverieError::Embedding(e.to_string()))?
            .error_for_status()
            .map_err(|e| ReverieError::Embedding(e.to_string()))?;

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ReverieError::Embedding(format!("malformed response: {}", e)))?;

        if body.embedding.len() != self.config.embedding_dim {
            return Err(ReverieError::Embedding(format!(
                "service returned {}-dimensional vector, expected {}",
                body.embedding.len(),
                self.config.embedding_dim
            )));
        }

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(text, body.embedding.clone());
        }
        Ok(body.embedding)
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, ReverieError> {
        let url = format!("{}/api/generate", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .timeout(Duration::from_secs(self.config.generate_timeout_secs))
            .json(&GenerateRequest {
                model: &self.config.chat_model,
                prompt,
                stream: false,
                options: GenerateOptions {
                    temperature: self.config.temperature,
                    num_ctx: self.config.num_ctx,
                },
            })
            .send()
            .await
            .map_err(|e| ReverieError::Generation(e.to_string()))?
            .error_for_status()
            .map_err(|e| ReverieError::Generation(e.to_string()))?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ReverieError::Generation(format!("malformed response: {}", e)))?;

        Ok(body.response)
    }
}

impl EmbeddingService for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ReverieError> {
        self.embed_text(text).await
    }

    fn dimensions(&self) -> usize {
        self.config.embedding_dim
    }
}

impl GenerationService for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, ReverieError> {
        self.generate_text(prompt).await
    }
}
