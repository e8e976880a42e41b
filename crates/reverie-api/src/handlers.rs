//! Route handler functions for all API endpoints.
//!
//! Each handler extracts parameters via axum extractors, interacts with
//! AppState services, and returns JSON responses.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct StoreDocumentRequest {
    /// Caller-supplied identifier; omitted means one is generated.
    pub doc_id: Option<String>,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
    pub query: String,
    pub top_k: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<Uuid>,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreDocumentResponse {
    pub status: String,
    pub stored_id: String,
    pub position: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RetrievedItem {
    pub doc_id: String,
    pub text_excerpt: String,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RetrieveResponse {
    pub results: Vec<RetrievedItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub doc_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub position: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponseBody {
    pub reply: String,
    pub session_id: Uuid,
    pub sources: Vec<String>,
    pub confidence_scores: Vec<f64>,
    pub timestamps: Vec<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub document_count: u64,
    pub index_size: u64,
}

// =============================================================================
// Handler functions
// =============================================================================

/// POST /documents - store a document, replacing any prior one with the
/// same identifier.
pub async fn store_document(
    State(state): State<AppState>,
    Json(request): Json<StoreDocumentRequest>,
) -> Result<Json<StoreDocumentResponse>, ApiError> {
    let doc_id = request
        .doc_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(generated_doc_id);

    let receipt = state.store.store(&doc_id, &request.text).await?;

    Ok(Json(StoreDocumentResponse {
        status: "stored".to_string(),
        stored_id: receipt.doc_id,
        position: receipt.position,
        timestamp: receipt.timestamp,
    }))
}

/// POST /retrieve - rank stored documents against a query.
///
/// Always returns 200; an empty index, a blank query, or a degraded
/// embedding service all yield an empty result list.
pub async fn retrieve(
    State(state): State<AppState>,
    Json(request): Json<RetrieveRequest>,
) -> Json<RetrieveResponse> {
    let store_config = &state.config.store;
    let top_k = request
        .top_k
        .unwrap_or(store_config.default_top_k)
        .clamp(1, store_config.max_top_k);

    let results = state
        .store
        .retrieve(&request.query, top_k)
        .await
        .into_iter()
        .map(|doc| RetrievedItem {
            text_excerpt: excerpt(&doc.text, store_config.excerpt_chars),
            doc_id: doc.doc_id,
            score: doc.score,
            timestamp: doc.timestamp,
        })
        .collect();

    Json(RetrieveResponse { results })
}

/// GET /documents/{doc_id} - fetch a live document.
pub async fn get_document(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let record = state.store.get(&doc_id)?;
    Ok(Json(DocumentResponse {
        doc_id,
        text: record.text,
        timestamp: record.timestamp,
        position: record.position as u64,
    }))
}

/// DELETE /documents/{doc_id} - logically delete a document.
pub async fn delete_document(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete(&doc_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /chat - answer a message using retrieved context.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponseBody>, ApiError> {
    let (reply, session_id) = state
        .chat
        .handle_message(&request.message, request.session_id)
        .await?;

    Ok(Json(ChatResponseBody {
        reply: reply.reply,
        session_id,
        sources: reply.sources,
        confidence_scores: reply.confidence_scores,
        timestamps: reply.timestamps,
    }))
}

/// GET /health - liveness and basic store statistics.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        document_count: state.store.document_count() as u64,
        index_size: state.store.index_len() as u64,
    })
}

/// Identifier generated for callers that omit `doc_id`, derived from the
/// ingestion timestamp.
fn generated_doc_id() -> String {
    format!("doc-{}", Utc::now().timestamp_millis())
}

/// First `max_chars` characters of `text`, respecting char boundaries.
fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_doc_id_shape() {
        let id = generated_doc_id();
        assert!(id.starts_with("doc-"));
        assert!(id["doc-".len()..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_excerpt_short_text_unchanged() {
        assert_eq!(excerpt("hello", 240), "hello");
    }

    #[test]
    fn test_excerpt_truncates_long_text() {
        let text = "a".repeat(500);
        assert_eq!(excerpt(&text, 240).len(), 240);
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let text = "héllo wörld";
        let cut = excerpt(text, 4);
        assert_eq!(cut, "héll");
    }
}
