use async_trait::async_trait;

use crate::core::errors::EngineError;

/// Completion collaborator used for query enhancement, SQL generation and
/// free-text answers. Output is untrusted.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// return the generator name (e.g. "openai", "ollama")
    fn name(&self) -> &str {
        "generator"
    }

    /// single-shot completion for a fully rendered prompt
    async fn complete(&self, prompt: &str) -> Result<String, EngineError>;
}
