//! Chat engine: coordinates retrieval, prompt assembly, and generation.
//!
//! Each message resolves to a session (created or reused), retrieves
//! context documents from the store, assembles the prompt, and calls the
//! generation service. A generation failure substitutes the degraded reply
//! rather than surfacing an error; retrieval failures already degrade to an
//! empty context inside the store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use reverie_core::config::ChatConfig;
use reverie_core::types::ConversationTurn;
use reverie_store::DocumentStore;

use crate::context::{ChatSession, SessionManager};
use crate::error::ChatError;
use crate::generation::{DynGenerationService, GenerationService};
use crate::prompt::PromptBuilder;
use crate::response::{polish_reply, DEGRADED_REPLY};

/// The reply payload for one chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    /// Generated (or degraded) reply text.
    pub reply: String,
    /// Identifiers of the documents used as context, best match first.
    pub sources: Vec<String>,
    /// Similarity score per source, aligned with `sources`.
    pub confidence_scores: Vec<f64>,
    /// Ingestion timestamp per source, aligned with `sources`.
    pub timestamps: Vec<DateTime<Utc>>,
}

/// Central chat coordinator over the document store and generation service.
pub struct ChatEngine {
    store: Arc<DocumentStore>,
    generator: Box<dyn DynGenerationService>,
    prompt: PromptBuilder,
    manager: SessionManager,
    sessions: Mutex<HashMap<Uuid, ChatSession>>,
    config: ChatConfig,
}

impl ChatEngine {
    /// Create an engine with the given store, generator, and configuration.
    pub fn new(
        store: Arc<DocumentStore>,
        generator: impl GenerationService + 'static,
        config: ChatConfig,
    ) -> Self {
        Self::new_dyn(store, Box::new(generator), config)
    }

    /// Create an engine from a pre-boxed dynamic generation service.
    pub fn new_dyn(
        store: Arc<DocumentStore>,
        generator: Box<dyn DynGenerationService>,
        config: ChatConfig,
    ) -> Self {
        let manager = SessionManager::new(config.context_turns, config.session_timeout_minutes);
        Self {
            store,
            generator,
            prompt: PromptBuilder::new(),
            manager,
            sessions: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Handle an incoming chat message.
    ///
    /// Returns the reply and the session ID (new or existing).
    pub async fn handle_message(
        &self,
        message: &str,
        session_id: Option<Uuid>,
    ) -> Result<(ChatReply, Uuid), ChatError> {
        if !self.config.enabled {
            return Err(ChatError::Disabled);
        }

        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if message.chars().count() > self.config.max_message_chars {
            return Err(ChatError::MessageTooLong(self.config.max_message_chars));
        }

        let sid = self.resolve_session(session_id)?;

        // Retrieval degrades to an empty context on its own; no error path.
        let retrieved = self
            .store
            .retrieve(message, self.config.retrieve_top_k)
            .await;

        // Snapshot the window so the lock is not held across the
        // generation call.
        let window = {
            let sessions = self.lock_sessions()?;
            sessions
                .get(&sid)
                .map(|s| s.window.clone())
                .unwrap_or_else(|| self.manager.create_session().window)
        };

        let prompt = self.prompt.build(message, &retrieved, &window);
        debug!(session = %sid, context_docs = retrieved.len(), "Prompt assembled");

        let reply_text = match self.generator.generate_boxed(&prompt).await {
            Ok(raw) => polish_reply(&raw),
            Err(e) => {
                warn!(error = %e, "Generation failed; substituting degraded reply");
                DEGRADED_REPLY.to_string()
            }
        };

        {
            let mut sessions = self.lock_sessions()?;
            if let Some(session) = sessions.get_mut(&sid) {
                session.window.push(ConversationTurn::user(message));
                session
                    .window
                    .push(ConversationTurn::assistant(reply_text.clone()));
                self.manager.touch(session);
            }
        }

        let reply = ChatReply {
            reply: reply_text,
            sources: retrieved.iter().map(|d| d.doc_id.clone()).collect(),
            confidence_scores: retrieved.iter().map(|d| d.score).collect(),
            timestamps: retrieved.iter().map(|d| d.timestamp).collect(),
        };

        Ok((reply, sid))
    }

    /// Number of active sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Resolve or create a session ID.
    fn resolve_session(&self, requested: Option<Uuid>) -> Result<Uuid, ChatError> {
        let mut sessions = self.lock_sessions()?;

        if let Some(sid) = requested {
            if let Some(session) = sessions.get(&sid) {
                if !self.manager.is_expired(session) {
                    return Ok(sid);
                }
                // Session expired; remove and create new.
                sessions.remove(&sid);
            }
        }

        let session = self.manager.create_session();
        let sid = session.id;
        sessions.insert(sid, session);
        Ok(sid)
    }

    fn lock_sessions(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, ChatSession>>, ChatError> {
        self.sessions
            .lock()
            .map_err(|e| ChatError::Store(format!("session lock poisoned: {}", e)))
    }
}

// =============================================================================
// Tests
// =============================================================================
