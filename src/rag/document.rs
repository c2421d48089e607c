//! Knowledge-base documents shared by every retrieval strategy.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Closed set of knowledge-base document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Schema and table documentation used for SQL generation.
    Doc,
    /// Free-text documentation used for question answering.
    T2tDoc,
    /// A question/SQL pair.
    SqlExample,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Doc => "doc",
            DocumentKind::T2tDoc => "t2t_doc",
            DocumentKind::SqlExample => "sql_example",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// File name or other origin identifier.
    pub source: String,
    pub kind: DocumentKind,
    /// Loader-specific fields (e.g. the question of a SQL example).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        kind: DocumentKind,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: DocumentMetadata {
                source: source.into(),
                kind,
                extra: HashMap::new(),
            },
        }
    }

    /// Creates a document whose id is derived from its kind and source.
    pub fn from_source(
        text: impl Into<String>,
        kind: DocumentKind,
        source: impl Into<String>,
    ) -> Self {
        let source = source.into();
        let id = Self::derived_id(kind, &source);
        Self::new(id, text, kind, source)
    }

    /// `"{kind}_{sha256(source)[..16]}"`, stable across rebuilds.
    pub fn derived_id(kind: DocumentKind, source: &str) -> String {
        let digest = Sha256::digest(source.as_bytes());
        let hex = hex::encode(digest);
        format!("{}_{}", kind.as_str(), &hex[..16])
    }

    /// Builds the text of a SQL example the way the knowledge base stores it.
    pub fn sql_example(question: &str, sql: &str, source: impl Into<String>) -> Self {
        let mut doc = Self::from_source(
            format!("Question: {}\nSQL: {}", question, sql),
            DocumentKind::SqlExample,
            source,
        );
        doc.metadata
            .extra
            .insert("question".to_string(), Value::String(question.to_string()));
        doc
    }

    pub fn kind(&self) -> DocumentKind {
        self.metadata.kind
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.extra.insert(key.into(), value);
        self
    }
}

/// Resolves document ids back to documents after fusion.
pub trait DocumentLookup {
    fn document(&self, id: &str) -> Option<&Document>;
}

impl DocumentLookup for HashMap<String, Document> {
    fn document(&self, id: &str) -> Option<&Document> {
        self.get(id)
    }
}
