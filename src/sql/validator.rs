//! Read-only statement gate.
//!
//! A statement is accepted only if, in order:
//! 1. it is not empty or whitespace,
//! 2. it starts with `select` followed by whitespace,
//! 3. no blacklisted keyword occurs as a whole word anywhere in it,
//! 4. it contains neither `pg_sleep` nor `sleep(`.
//!
//! Matching is case-insensitive and purely lexical. Keywords inside string
//! literals are rejected as well.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::config::defaults::DEFAULT_SQL_BLACKLIST;
use crate::core::errors::EngineError;

const SLEEP_PATTERNS: [&str; 2] = ["pg_sleep", "sleep("];

fn select_regex() -> &'static Regex {
    static SELECT_RE: OnceLock<Regex> = OnceLock::new();
    SELECT_RE.get_or_init(|| Regex::new(r"^\s*select\s+").expect("static regex is valid"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementVerdict {
    pub allowed: bool,
    /// Present iff the statement was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StatementVerdict {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatementValidator {
    keywords: Vec<String>,
    keyword_re: Option<Regex>,
}

impl Default for StatementValidator {
    fn default() -> Self {
        let keywords: Vec<String> = DEFAULT_SQL_BLACKLIST
            .iter()
            .map(|keyword| keyword.to_string())
            .collect();
        Self::new(&keywords).expect("default blacklist compiles")
    }
}

impl StatementValidator {
    /// Blank keywords are ignored; the rest are matched as literal words.
    pub fn new(keywords: &[String]) -> Result<Self, EngineError> {
        let keywords: Vec<String> = keywords
            .iter()
            .map(|keyword| keyword.trim().to_lowercase())
            .filter(|keyword| !keyword.is_empty())
            .collect();

        let keyword_re = if keywords.is_empty() {
            None
        } else {
            let alternation = keywords
                .iter()
                .map(|keyword| regex::escape(keyword))
                .collect::<Vec<_>>()
                .join("|");
            let re = Regex::new(&format!(r"\b(?:{})\b", alternation))
                .map_err(|e| EngineError::BadRequest(format!("invalid sql.blacklist: {}", e)))?;
            Some(re)
        };

        Ok(Self {
            keywords,
            keyword_re,
        })
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn check(&self, sql: &str) -> StatementVerdict {
        if sql.trim().is_empty() {
            return StatementVerdict::reject("empty statement");
        }

        let normalized = sql.trim().to_lowercase();
        if !select_regex().is_match(&normalized) {
            return StatementVerdict::reject("statement must start with SELECT");
        }

        if let Some(found) = self
            .keyword_re
            .as_ref()
            .and_then(|re| re.find(&normalized))
        {
            return StatementVerdict::reject(format!(
                "forbidden keyword '{}'",
                found.as_str()
            ));
        }

        if let Some(pattern) = SLEEP_PATTERNS.iter().find(|p| normalized.contains(*p)) {
            return StatementVerdict::reject(format!("forbidden function '{}'", pattern));
        }

        StatementVerdict::allow()
    }

    pub fn is_safe_select(&self, sql: &str) -> bool {
        self.check(sql).allowed
    }
}

fn default_validator() -> &'static StatementValidator {
    static VALIDATOR: OnceLock<StatementValidator> = OnceLock::new();
    VALIDATOR.get_or_init(StatementValidator::default)
}

/// Checks `sql` against the default keyword blacklist.
pub fn is_safe_select(sql: &str) -> bool {
    default_validator().is_safe_select(sql)
}
