//! Validated statement execution.
//!
//! Every statement is re-checked by the validator before it reaches the
//! connection. Outcomes, including driver errors, are normalized into an
//! [`ExecutionResult`]; nothing is raised to the caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::validator::StatementValidator;
use crate::core::config::SqlConfig;
use crate::core::errors::EngineError;

pub const FORBIDDEN_STATEMENT_MESSAGE: &str =
    "Forbidden statement type: only read-only SELECT statements are allowed";

/// Column names and positional rows as fetched from the database.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// A database handle that can run one statement and fetch every row.
///
/// Implementations own acquisition and release of whatever cursor or pooled
/// connection they need; it must be released on every exit path, including
/// when the returned future is dropped.
#[async_trait]
pub trait SqlConnection: Send + Sync {
    async fn fetch_all(&self, sql: &str) -> Result<QueryRows, EngineError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    /// The trimmed statement as received.
    pub query: String,
    /// Rows actually fetched, independent of the cap on `data`.
    pub row_count: usize,
    pub columns: Vec<String>,
    pub data: Vec<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn failure(query: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            query: query.to_string(),
            row_count: 0,
            columns: Vec::new(),
            data: Vec::new(),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionGateway {
    validator: StatementValidator,
    row_cap: usize,
}

impl Default for ExecutionGateway {
    fn default() -> Self {
        Self::new(StatementValidator::default(), SqlConfig::default().row_cap)
    }
}

impl ExecutionGateway {
    pub fn new(validator: StatementValidator, row_cap: usize) -> Self {
        Self { validator, row_cap }
    }

    pub fn from_config(config: &SqlConfig) -> Result<Self, EngineError> {
        Ok(Self::new(
            StatementValidator::new(&config.blacklist)?,
            config.row_cap,
        ))
    }

    pub fn validator(&self) -> &StatementValidator {
        &self.validator
    }

    pub fn row_cap(&self) -> usize {
        self.row_cap
    }

    pub async fn run(&self, connection: &dyn SqlConnection, sql: &str) -> ExecutionResult {
        let query = sql.trim();

        let verdict = self.validator.check(query);
        if !verdict.allowed {
            let reason = verdict.reason.unwrap_or_default();
            tracing::info!("Rejected statement ({}): {}", reason, query);
            return ExecutionResult::failure(
                query,
                format!("{} ({})", FORBIDDEN_STATEMENT_MESSAGE, reason),
            );
        }

        match connection.fetch_all(query).await {
            Ok(fetched) => {
                let row_count = fetched.rows.len();
                let data = fetched
                    .rows
                    .into_iter()
                    .take(self.row_cap)
                    .map(|row| zip_row(&fetched.columns, row))
                    .collect();
                tracing::debug!("Statement returned {} rows", row_count);

                ExecutionResult {
                    success: true,
                    query: query.to_string(),
                    row_count,
                    columns: fetched.columns,
                    data,
                    error: None,
                }
            }
            Err(e) => {
                let message = match e {
                    EngineError::Database(msg) => msg,
                    other => other.to_string(),
                };
                tracing::warn!("SQL execution failed: {}", message);
                ExecutionResult::failure(query, format!("SQL execution failed: {}", message))
            }
        }
    }
}

/// Later columns win when a result set repeats a column name.
fn zip_row(columns: &[String], row: Vec<Value>) -> Map<String, Value> {
    columns.iter().cloned().zip(row).collect()
}
