//! Question-to-SQL generation and guarded execution.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::llm::prompt::sql_prompt;
use crate::query::enhancer::strip_code_fences;
use crate::query::EnhancedQuery;
use crate::rag::context_builder::format_sql_context;
use crate::rag::HybridContext;
use crate::sql::{ExecutionResult, SqlConnection};
use crate::state::EngineContext;

/// Everything produced while generating SQL for one question.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedSql {
    pub request_id: String,
    /// Untrusted generator output, or a `--` comment describing the failure.
    pub sql: String,
    pub enhanced: EnhancedQuery,
    pub context: HybridContext,
    pub generated: bool,
}

#[derive(Clone)]
pub struct SqlService {
    ctx: Arc<EngineContext>,
}

impl SqlService {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Enhance, retrieve, prompt, generate. Never fails: a generator error
    /// becomes a `-- SQL generation failed: ...` comment, which the gateway
    /// rejects if it is ever executed.
    pub async fn generate(&self, question: &str) -> GeneratedSql {
        let request_id = Uuid::new_v4().to_string();
        let config = self.ctx.config();
        let enhanced = self
            .ctx
            .enhancer()
            .enhance(question, &config.enhancer.schema_hint, self.ctx.generator())
            .await;

        let context = self
            .ctx
            .retriever()
            .await
            .search(&enhanced.rewritten_query)
            .await;
        tracing::info!(
            "[{}] Retrieved {} documents ({} SQL examples) for SQL generation",
            request_id,
            context.documents.len(),
            context.sql_examples.len()
        );

        let prompt = sql_prompt(question, &format_sql_context(&context), &enhanced);
        let (sql, generated) = match self.ctx.generator().complete(&prompt).await {
            Ok(output) => (clean_sql(&output), true),
            Err(e) => {
                tracing::warn!("[{}] SQL generation failed: {}", request_id, e);
                (format!("-- SQL generation failed: {}", e), false)
            }
        };

        GeneratedSql {
            request_id,
            sql,
            enhanced,
            context,
            generated,
        }
    }

    pub async fn generate_sql(&self, question: &str) -> String {
        self.generate(question).await.sql
    }

    pub async fn run_sql_safely(
        &self,
        connection: &dyn SqlConnection,
        sql: &str,
    ) -> ExecutionResult {
        self.ctx.gateway().run(connection, sql).await
    }
}

fn clean_sql(output: &str) -> String {
    strip_code_fences(output).to_string()
}
