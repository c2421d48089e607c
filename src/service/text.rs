//! Knowledge-base lookup and free-text answers.

use std::sync::Arc;

use crate::llm::prompt::text_prompt;
use crate::rag::context_builder::format_text_context;
use crate::rag::DocumentKind;
use crate::state::EngineContext;

pub const NO_RELEVANT_INFORMATION: &str = "No relevant information found.";

#[derive(Clone)]
pub struct TextService {
    ctx: Arc<EngineContext>,
}

impl TextService {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Documentation texts (schema docs and free-text docs) matching `query`,
    /// in fused order, separated by blank lines.
    pub async fn search_knowledge_base(&self, query: &str) -> String {
        let context = self.ctx.retriever().await.search(query).await;

        let texts: Vec<&str> = context
            .documents
            .iter()
            .filter(|doc| match doc.kind() {
                DocumentKind::Doc | DocumentKind::T2tDoc => true,
                DocumentKind::SqlExample => false,
            })
            .map(|doc| doc.text.as_str())
            .collect();

        if texts.is_empty() {
            NO_RELEVANT_INFORMATION.to_string()
        } else {
            texts.join("\n\n")
        }
    }

    /// Answers `question` from free-text documents. Generator failures are
    /// returned as an error message string.
    pub async fn generate_text(&self, question: &str) -> String {
        let context = self.ctx.retriever().await.search(question).await;
        let prompt = text_prompt(question, &format_text_context(&context));

        match self.ctx.generator().complete(&prompt).await {
            Ok(answer) => answer.trim().to_string(),
            Err(e) => {
                tracing::warn!("Text generation failed: {}", e);
                format!("Text generation failed: {}", e)
            }
        }
    }
}
