use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ReverieError, Result};

/// Top-level configuration for the Reverie application.
///
/// Loaded from `~/.reverie/config.toml` by default. Each section corresponds
/// to a subsystem or cross-cutting concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReverieConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl ReverieConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ReverieConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ReverieError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the persisted index and metadata artifacts.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// TCP port for the HTTP API.
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.reverie/data".to_string(),
            log_level: "info".to_string(),
            port: 5010,
        }
    }
}

/// Settings for the external model service (embeddings + generation).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of the Ollama-compatible model server.
    pub base_url: String,
    /// Embedding model name.
    pub embed_model: String,
    /// Chat/generation model name.
    pub chat_model: String,
    /// Expected embedding dimension.
    pub embedding_dim: usize,
    /// Timeout for embedding requests, in seconds.
    pub embed_timeout_secs: u64,
    /// Timeout for generation requests, in seconds.
    pub generate_timeout_secs: u64,
    /// Sampling temperature for generation.
    pub temperature: f64,
    /// Context window size passed to the generation model.
    pub num_ctx: u32,
    /// Maximum number of cached identical-text embeddings.
    pub embed_cache_capacity: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            chat_model: "llama3.2".to_string(),
            embedding_dim: 768,
            embed_timeout_secs: 30,
            generate_timeout_secs: 120,
            temperature: 0.7,
            num_ctx: 4096,
            embed_cache_capacity: 100,
        }
    }
}

/// Document store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Mutations between periodic saves of the index + metadata artifacts.
    pub save_interval: u32,
    /// Default number of results for retrieval requests.
    pub default_top_k: usize,
    /// Maximum number of results a single retrieval request may ask for.
    pub max_top_k: usize,
    /// Length of the text excerpt returned by the retrieve API, in characters.
    pub excerpt_chars: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            save_interval: 50,
            default_top_k: 3,
            max_top_k: 100,
            excerpt_chars: 240,
        }
    }
}

/// Conversational interface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Whether the chat endpoint is enabled.
    pub enabled: bool,
    /// Maximum number of recent turns kept in a session's context window.
    pub context_turns: usize,
    /// Session inactivity timeout in minutes.
    pub session_timeout_minutes: u32,
    /// Maximum chat message length in characters.
    pub max_message_chars: usize,
    /// Number of documents retrieved as context for each chat message.
    pub retrieve_top_k: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            context_turns: 10,
            session_timeout_minutes: 30,
            max_message_chars: 2000,
            retrieve_top_k: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = ReverieConfig::default();
        assert_eq!(config.general.data_dir, "~/.reverie/data");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.port, 5010);
        assert_eq!(config.model.base_url, "http://localhost:11434");
        assert_eq!(config.model.embed_model, "nomic-embed-text");
        assert_eq!(config.model.embedding_dim, 768);
        assert_eq!(config.store.save_interval, 50);
        assert_eq!(config.store.default_top_k, 3);
        assert_eq!(config.chat.context_turns, 10);
        assert!(config.chat.enabled);
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
data_dir = "/custom/data"
log_level = "debug"
port = 8080

[model]
base_url = "http://model-host:11434"
embedding_dim = 384

[store]
save_interval = 10
"#;
        let file = create_temp_config(content);
        let config = ReverieConfig::load(file.path()).unwrap();
        assert_eq!(config.general.data_dir, "/custom/data");
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.port, 8080);
        assert_eq!(config.model.base_url, "http://model-host:11434");
        assert_eq!(config.model.embedding_dim, 384);
        assert_eq!(config.store.save_interval, 10);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[general]
log_level = "warn"
"#;
        let file = create_temp_config(content);
        let config = ReverieConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "warn");
        // Remaining fields use defaults
        assert_eq!(config.general.port, 5010);
        assert_eq!(config.model.embedding_dim, 768);
        assert_eq!(config.store.save_interval, 50);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = ReverieConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.general.data_dir, "~/.reverie/data");
    }

    #[test]
    fn test_load_invalid_toml_errors() {
        let content = "this is {{ not valid TOML";
        let file = create_temp_config(content);
        assert!(ReverieConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = ReverieConfig::default();
        config.save(&path).unwrap();

        let reloaded = ReverieConfig::load(&path).unwrap();
        assert_eq!(reloaded.general.data_dir, config.general.data_dir);
        assert_eq!(reloaded.model.embed_model, config.model.embed_model);
        assert_eq!(reloaded.store.save_interval, config.store.save_interval);
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("dir").join("config.toml");

        ReverieConfig::default().save(&path).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = ReverieConfig::load(file.path()).unwrap();
        assert_eq!(config.general.port, 5010);
        assert_eq!(config.chat.max_message_chars, 2000);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = ReverieConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let deserialized: ReverieConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized.general.log_level, config.general.log_level);
        assert_eq!(deserialized.model.num_ctx, config.model.num_ctx);
        assert_eq!(deserialized.chat.retrieve_top_k, config.chat.retrieve_top_k);
    }
}
