//! Generation service trait and test implementation.
//!
//! The production backend is the HTTP client in `reverie-model`.
//! `MockGeneration` provides canned replies or failures for testing.

use reverie_core::error::ReverieError;

/// Service that turns an assembled prompt into a free-text reply.
pub trait GenerationService: Send + Sync {
    /// Generate a reply for the given prompt.
    fn generate(
        &self,
        prompt: &str,
    ) -> impl std::future::Future<Output = Result<String, ReverieError>> + Send;
}

/// Object-safe version of [`GenerationService`] for dynamic dispatch.
///
/// Same pattern as the embedding trait pair: `generate` returns
/// `impl Future`, so dynamic dispatch needs a boxed-future twin with a
/// blanket implementation.
pub trait DynGenerationService: Send + Sync {
    /// Generate a reply for the given prompt (boxed future).
    fn generate_boxed<'a>(
        &'a self,
        prompt: &'a str,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<String, ReverieError>> + Send + 'a>,
    >;
}

impl<T: GenerationService> DynGenerationService for T {
    fn generate_boxed<'a>(
        &'a self,
        prompt: &'a str,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<String, ReverieError>> + Send + 'a>,
    > {
        Box::pin(self.generate(prompt))
    }
}

/// Mock generation service returning a fixed reply or a fixed failure.
#[derive(Debug, Clone)]
pub struct MockGeneration {
    reply: Option<String>,
}

impl MockGeneration {
    /// A mock that always replies with `text`.
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Some(text.into()),
        }
    }

    /// A mock that always fails, for degradation tests.
    pub fn failing() -> Self {
        Self { reply: None }
    }
}

impl GenerationService for MockGeneration {
    async fn generate(&self, _prompt: &str) -> Result<String, ReverieError> {
        match &self.reply {
            Some(text) => Ok(text.clone()),
            None => Err(ReverieError::Generation("service down".to_string())),
        }
    }
}
