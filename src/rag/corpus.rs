//! Corpus providers feed documents to index builds.

use async_trait::async_trait;

use super::document::Document;
use crate::core::errors::EngineError;

/// Yields the documents of a named corpus. Called once per index build.
#[async_trait]
pub trait CorpusProvider: Send + Sync {
    async fn load(&self, corpus_id: &str) -> Result<Vec<Document>, EngineError>;
}

/// A corpus held in memory, e.g. preloaded by the host application.
#[derive(Debug, Clone, Default)]
pub struct StaticCorpus {
    documents: Vec<Document>,
}

impl StaticCorpus {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl CorpusProvider for StaticCorpus {
    async fn load(&self, _corpus_id: &str) -> Result<Vec<Document>, EngineError> {
        Ok(self.documents.clone())
    }
}
