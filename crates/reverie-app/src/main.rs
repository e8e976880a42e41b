//! Reverie application binary - composition root.
//!
//! Ties together the Reverie crates into a single executable:
//! 1. Load configuration from TOML
//! 2. Open the document store (loading persisted index + metadata)
//! 3. Wire the Ollama client for embeddings and generation
//! 4. Start the axum REST API server
//! 5. Flush the store on graceful shutdown

use std::path::PathBuf;
use std::sync::Arc;

use reverie_api::{routes, AppState};
use reverie_chat::ChatEngine;
use reverie_core::ReverieConfig;
use reverie_model::OllamaClient;
use reverie_store::{DocumentStore, PersistenceManager};

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

/// Resolve the config file path (REVERIE_CONFIG env, or ~/.reverie/config.toml).
fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var("REVERIE_CONFIG") {
        return PathBuf::from(p);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".reverie").join("config.toml");
    }
    PathBuf::from("config.toml")
}

/// Resolve on Ctrl-C so the server can drain and the store can flush.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting Reverie v{}", env!("CARGO_PKG_VERSION"));

    // Config.
    let config_file = config_path();
    let config = ReverieConfig::load_or_default(&config_file);
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Data directory.
    let data_dir = resolve_data_dir(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }

    // Document store with its embedding client. Missing or corrupt
    // artifacts load as an empty store; startup never fails on them.
    let embed_client = OllamaClient::new(config.model.clone())?;
    let store = Arc::new(DocumentStore::open(
        PersistenceManager::new(&data_dir),
        embed_client,
        config.store.save_interval,
    ));
    tracing::info!(
        path = %data_dir.display(),
        documents = store.document_count(),
        vectors = store.index_len(),
        "Document store ready"
    );

    // Chat engine with its own client connection to the model server.
    let generation_client = OllamaClient::new(config.model.clone())?;
    let chat = ChatEngine::new(Arc::clone(&store), generation_client, config.chat.clone());

    let state = AppState::new(config.clone(), Arc::clone(&store), chat);

    // === API server ===

    let port = std::env::var("REVERIE_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(config.general.port);
    let addr = format!("127.0.0.1:{}", port);

    let router = routes::create_router(state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind; is another instance running?");
            tracing::error!("Try: REVERIE_PORT={} cargo run -p reverie-app", port + 1);
            return Err(e.into());
        }
    };

    tracing::info!(addr = %addr, "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Persist any mutations since the last periodic save.
    match store.flush().await {
        Ok(()) => tracing::info!("Store flushed; shutting down"),
        Err(e) => tracing::error!(error = %e, "Final flush failed"),
    }

    Ok(())
}
