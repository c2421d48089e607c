//! Optional pre-retrieval rewrite of a natural-language question.
//!
//! The generation collaborator is asked for a JSON object describing the
//! question. Any failure (collaborator error, timeout, malformed output)
//! yields [`EnhancedQuery::fallback`], so retrieval always gets a usable
//! query string.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::config::EnhancerConfig;
use crate::core::errors::EngineError;
use crate::llm::prompt::enhancer_prompt;
use crate::llm::TextGenerator;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancedQuery {
    pub rewritten_query: String,
    pub mentioned_tables: BTreeSet<String>,
    /// Empty when the question has no time condition.
    pub time_constraints: String,
    /// Aggregation hint such as `COUNT` or `AVG`, possibly empty.
    pub aggregation: String,
    pub filter_conditions: Vec<String>,
}

impl EnhancedQuery {
    /// The verbatim question with every structured field empty.
    pub fn fallback(question: &str) -> Self {
        Self {
            rewritten_query: question.to_string(),
            ..Default::default()
        }
    }
}

/// Collaborator output; every field is optional because model output is
/// not trusted to follow the format.
#[derive(Debug, Deserialize)]
struct RawUnderstanding {
    rewritten_query: Option<String>,
    mentioned_tables: Option<Vec<String>>,
    time_constraints: Option<String>,
    aggregation: Option<String>,
    filter_conditions: Option<Vec<Value>>,
}

#[derive(Debug, Clone)]
pub struct QueryEnhancer {
    enabled: bool,
    timeout: Duration,
}

impl Default for QueryEnhancer {
    fn default() -> Self {
        Self::from_config(&EnhancerConfig::default())
    }
}

impl QueryEnhancer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            enabled: true,
            timeout,
        }
    }

    pub fn from_config(config: &EnhancerConfig) -> Self {
        Self {
            enabled: config.enabled,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub async fn enhance(
        &self,
        question: &str,
        schema_hint: &str,
        generator: &dyn TextGenerator,
    ) -> EnhancedQuery {
        if !self.enabled || question.trim().is_empty() {
            return EnhancedQuery::fallback(question);
        }

        match self.try_enhance(question, schema_hint, generator).await {
            Ok(enhanced) => {
                tracing::debug!("Enhanced query: {:?}", enhanced);
                enhanced
            }
            Err(e) => {
                tracing::warn!("Query enhancement failed, using the original question: {}", e);
                EnhancedQuery::fallback(question)
            }
        }
    }

    async fn try_enhance(
        &self,
        question: &str,
        schema_hint: &str,
        generator: &dyn TextGenerator,
    ) -> Result<EnhancedQuery, EngineError> {
        let prompt = enhancer_prompt(question, schema_hint);
        let output = tokio::time::timeout(self.timeout, generator.complete(&prompt))
            .await
            .map_err(|_| EngineError::Timeout(self.timeout.as_secs()))??;

        parse_understanding(&output)
    }
}

/// Parses collaborator output, tolerating Markdown code fences and text
/// around the JSON object.
pub fn parse_understanding(output: &str) -> Result<EnhancedQuery, EngineError> {
    let body = extract_json_object(strip_code_fences(output))
        .ok_or_else(|| EngineError::collaborator("no JSON object in enhancer output"))?;

    let raw: RawUnderstanding = serde_json::from_str(body)
        .map_err(|e| EngineError::collaborator(format!("invalid enhancer JSON: {}", e)))?;

    let rewritten_query = raw
        .rewritten_query
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| EngineError::collaborator("enhancer returned an empty rewritten_query"))?;

    let mentioned_tables = raw
        .mentioned_tables
        .unwrap_or_default()
        .into_iter()
        .map(|table| table.trim().to_string())
        .filter(|table| !table.is_empty())
        .collect();

    let filter_conditions = raw
        .filter_conditions
        .unwrap_or_default()
        .into_iter()
        .filter_map(|condition| match condition {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.trim().to_string()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .collect();

    Ok(EnhancedQuery {
        rewritten_query,
        mentioned_tables,
        time_constraints: raw.time_constraints.unwrap_or_default().trim().to_string(),
        aggregation: raw.aggregation.unwrap_or_default().trim().to_string(),
        filter_conditions,
    })
}

/// Strips a Markdown code fence and its language tag line.
pub(crate) fn strip_code_fences(output: &str) -> &str {
    let trimmed = output.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Scripted {
        reply: Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn ok(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err("rate limited".to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn complete(&self, prompt: &str) -> Result<String, EngineError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().map_err(EngineError::Collaborator)
        }
    }

    struct Stalled;

    #[async_trait]
    impl TextGenerator for Stalled {
        async fn complete(&self, _prompt: &str) -> Result<String, EngineError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("{}".to_string())
        }
    }

    const QUESTION: &str = "how many orders did new users place last month";

    #[tokio::test]
    async fn failing_collaborator_yields_fallback() {
        let enhanced = QueryEnhancer::default()
            .enhance(QUESTION, "users, orders", &Scripted::failing())
            .await;

        assert_eq!(enhanced, EnhancedQuery::fallback(QUESTION));
        assert_eq!(enhanced.rewritten_query, QUESTION);
        assert!(enhanced.mentioned_tables.is_empty());
        assert!(enhanced.time_constraints.is_empty());
        assert!(enhanced.aggregation.is_empty());
    }

    #[tokio::test]
    async fn timeout_yields_fallback() {
        let enhancer = QueryEnhancer::new(Duration::from_millis(50));
        let enhanced = enhancer.enhance(QUESTION, "orders", &Stalled).await;
        assert_eq!(enhanced, EnhancedQuery::fallback(QUESTION));
    }

    #[tokio::test]
    async fn parses_fenced_json() {
        let reply = r#"```json
{"rewritten_query": "count orders placed by users registered last month",
 "mentioned_tables": ["orders", "users", " "],
 "time_constraints": "last month",
 "aggregation": "COUNT",
 "filter_conditions": ["users.created_at >= now() - 1 month", null]}
```"#;
        let generator = Scripted::ok(reply);
        let enhanced = QueryEnhancer::default()
            .enhance(QUESTION, "users, orders", &generator)
            .await;

        assert_eq!(
            enhanced.rewritten_query,
            "count orders placed by users registered last month"
        );
        assert_eq!(
            enhanced.mentioned_tables.iter().collect::<Vec<_>>(),
            vec!["orders", "users"]
        );
        assert_eq!(enhanced.time_constraints, "last month");
        assert_eq!(enhanced.aggregation, "COUNT");
        assert_eq!(enhanced.filter_conditions.len(), 1);

        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("users, orders"));
        assert!(prompts[0].contains(QUESTION));
    }

    #[tokio::test]
    async fn empty_rewrite_or_garbage_falls_back() {
        for reply in [
            r#"{"rewritten_query": "   ", "mentioned_tables": ["orders"]}"#,
            "I cannot help with that.",
            r#"{"rewritten_query": 42}"#,
        ] {
            let enhanced = QueryEnhancer::default()
                .enhance(QUESTION, "orders", &Scripted::ok(reply))
                .await;
            assert_eq!(enhanced, EnhancedQuery::fallback(QUESTION));
        }
    }

    #[tokio::test]
    async fn disabled_enhancer_never_calls_the_collaborator() {
        let config = EnhancerConfig {
            enabled: false,
            ..EnhancerConfig::default()
        };
        let generator = Scripted::ok(r#"{"rewritten_query": "rewritten"}"#);
        let enhanced = QueryEnhancer::from_config(&config)
            .enhance(QUESTION, "orders", &generator)
            .await;

        assert_eq!(enhanced.rewritten_query, QUESTION);
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn missing_optional_fields_default_to_empty() {
        let enhanced = parse_understanding(r#"{"rewritten_query": "list products"}"#).unwrap();
        assert_eq!(enhanced.rewritten_query, "list products");
        assert!(enhanced.mentioned_tables.is_empty());
        assert!(enhanced.filter_conditions.is_empty());
    }
}
