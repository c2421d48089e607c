//! Typed engine configuration and its defaults.

use serde::{Deserialize, Serialize};

/// Statement keywords that make a SQL string non-read-only.
pub const DEFAULT_SQL_BLACKLIST: [&str; 17] = [
    "insert", "update", "delete", "drop", "alter", "truncate", "create", "grant", "revoke",
    "shutdown", "restart", "vacuum", "begin", "commit", "rollback", "lock", "call",
];

pub const DEFAULT_SCHEMA_HINT: &str = "users, orders, products, user_activity";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub retrieval: RetrievalConfig,
    pub lexical: LexicalConfig,
    pub enhancer: EnhancerConfig,
    pub sql: SqlConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// RRF smoothing constant.
    pub rrf_k: u32,
    /// Documents kept after fusion.
    pub top_k: usize,
    /// Vector collections queried by the semantic strategy.
    pub semantic_collections: Vec<String>,
    /// Candidates requested from each strategy before fusion.
    pub semantic_top_k: usize,
    pub lexical_weight: f64,
    pub semantic_weight: f64,
    /// Upper bound for one retrieval strategy, in seconds.
    pub timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            rrf_k: 60,
            top_k: 5,
            semantic_collections: vec!["docs".to_string(), "sql_examples".to_string()],
            semantic_top_k: 5,
            lexical_weight: 1.0,
            semantic_weight: 1.0,
            timeout_secs: 10,
        }
    }
}

/// BM25-Okapi parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalConfig {
    pub k1: f64,
    pub b: f64,
    /// Floor for negative IDF values, as a fraction of the average IDF.
    pub epsilon: f64,
}

impl Default for LexicalConfig {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            epsilon: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancerConfig {
    pub enabled: bool,
    pub timeout_secs: u64,
    pub schema_hint: String,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 15,
            schema_hint: DEFAULT_SCHEMA_HINT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlConfig {
    /// Maximum rows returned in `ExecutionResult::data`.
    pub row_cap: usize,
    pub blacklist: Vec<String>,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            row_cap: 100,
            blacklist: DEFAULT_SQL_BLACKLIST
                .iter()
                .map(|keyword| keyword.to_string())
                .collect(),
        }
    }
}
