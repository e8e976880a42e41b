//! Application state shared across all route handlers.
//!
//! AppState holds the store, the chat engine, and the configuration.
//! It is passed to handlers via axum's State extractor.

use std::sync::Arc;
use std::time::Instant;

use reverie_chat::ChatEngine;
use reverie_core::ReverieConfig;
use reverie_store::DocumentStore;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks. The store
/// serializes its own mutations internally; no additional locking here.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<ReverieConfig>,
    /// The persistent vector document store.
    pub store: Arc<DocumentStore>,
    /// Chat engine coordinating retrieval and generation.
    pub chat: Arc<ChatEngine>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState with the given components.
    pub fn new(config: ReverieConfig, store: Arc<DocumentStore>, chat: ChatEngine) -> Self {
        Self {
            config: Arc::new(config),
            store,
            chat: Arc::new(chat),
            start_time: Instant::now(),
        }
    }
}
