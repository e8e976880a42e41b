use thiserror::Error;

/// Top-level error type for the Reverie system.
///
/// Each variant corresponds to a failure class defined by the store and its
/// collaborators. Subsystem crates either use these variants directly or
/// define their own error types with `From<ReverieError>` so that the `?`
/// operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReverieError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Document text is empty")]
    EmptyDocument,

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding service unavailable: {0}")]
    Embedding(String),

    #[error("Generation service unavailable: {0}")]
    Generation(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for ReverieError {
    fn from(err: toml::de::Error) -> Self {
        ReverieError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ReverieError {
    fn from(err: toml::ser::Error) -> Self {
        ReverieError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ReverieError {
    fn from(err: serde_json::Error) -> Self {
        ReverieError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Reverie operations.
pub type Result<T> = std::result::Result<T, ReverieError>;
