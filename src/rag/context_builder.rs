//! Prompt context formatting for hybrid retrieval results.
//!
//! Empty buckets are replaced by a placeholder line so prompt templates never
//! receive an empty section.

use serde::{Deserialize, Serialize};

use super::document::Document;
use super::hybrid::HybridContext;

pub const NO_SQL_EXAMPLES: &str = "No SQL examples found";
pub const NO_DOCUMENTATION: &str = "No documentation found";
pub const NO_TEXT_DOCUMENTS: &str = "No relevant t2t_documents found";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextBuilderConfig {
    /// Maximum total context length in characters
    pub max_context_length: usize,
    /// Prefix each entry with `[n] (Source: ...)`
    pub include_citations: bool,
}

impl Default for ContextBuilderConfig {
    fn default() -> Self {
        Self {
            max_context_length: 8000,
            include_citations: false,
        }
    }
}

/// Context sections of a SQL generation prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlPromptContext {
    /// Schema documentation only.
    pub schema: String,
    /// SQL examples followed by documentation.
    pub examples: String,
}

#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    config: ContextBuilderConfig,
}

impl ContextBuilder {
    pub fn new(config: ContextBuilderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ContextBuilderConfig {
        &self.config
    }

    pub fn sql_context(&self, context: &HybridContext) -> SqlPromptContext {
        let schema = self.format_or(&context.docs, NO_DOCUMENTATION);

        let mut combined: Vec<&Document> = context.sql_examples.iter().collect();
        combined.extend(context.docs.iter());
        let examples = if context.sql_examples.is_empty() && context.docs.is_empty() {
            format!("{}\n\n{}", NO_SQL_EXAMPLES, NO_DOCUMENTATION)
        } else if context.sql_examples.is_empty() {
            format!("{}\n\n{}", NO_SQL_EXAMPLES, self.format_context(&combined))
        } else if context.docs.is_empty() {
            format!("{}\n\n{}", self.format_context(&combined), NO_DOCUMENTATION)
        } else {
            self.format_context(&combined)
        };

        SqlPromptContext { schema, examples }
    }

    pub fn text_context(&self, context: &HybridContext) -> String {
        self.format_or(&context.t2t_docs, NO_TEXT_DOCUMENTS)
    }

    fn format_or(&self, documents: &[Document], placeholder: &str) -> String {
        let refs: Vec<&Document> = documents.iter().collect();
        let formatted = self.format_context(&refs);
        if formatted.is_empty() {
            placeholder.to_string()
        } else {
            formatted
        }
    }

    fn format_context(&self, documents: &[&Document]) -> String {
        let mut context = String::new();
        let mut current_length = 0;

        for (i, doc) in documents.iter().enumerate() {
            let entry = if self.config.include_citations {
                format!(
                    "[{}] (Source: {})\n{}\n\n",
                    i + 1,
                    doc.metadata.source,
                    doc.text
                )
            } else {
                format!("{}\n\n", doc.text)
            };

            // Always keep the best entry, even if it alone exceeds the budget.
            if i > 0 && current_length + entry.len() > self.config.max_context_length {
                tracing::debug!(
                    "Context budget reached: kept {} of {} documents",
                    i,
                    documents.len()
                );
                break;
            }
            current_length += entry.len();
            context.push_str(&entry);
        }

        context.trim().to_string()
    }
}

/// SQL prompt sections with the default builder.
pub fn format_sql_context(context: &HybridContext) -> SqlPromptContext {
    ContextBuilder::default().sql_context(context)
}

pub fn format_text_context(context: &HybridContext) -> String {
    ContextBuilder::default().text_context(context)
}
