//! Hybrid retrieval: lexical and semantic search fused with RRF.
//!
//! Both strategies run concurrently and are bounded by the retrieval timeout.
//! A strategy that fails or times out contributes an empty list; the context
//! records which side degraded so callers can tell a thin answer from an
//! outage.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::document::{Document, DocumentKind};
use super::fusion::{join_documents, Candidate, RankFusion, WeightedList};
use super::lexical::LexicalIndex;
use super::semantic::SemanticSearcher;
use crate::core::config::RetrievalConfig;

/// Fused retrieval output, bucketed by document kind.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HybridContext {
    /// All joined documents in fused order.
    pub documents: Vec<Document>,
    pub docs: Vec<Document>,
    pub t2t_docs: Vec<Document>,
    pub sql_examples: Vec<Document>,
    /// Fused ids before the join, including stale ones.
    pub raw_ids: Vec<String>,
    pub lexical_degraded: bool,
    pub semantic_degraded: bool,
}

impl HybridContext {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn from_documents(documents: Vec<Document>, raw_ids: Vec<String>) -> Self {
        let mut context = HybridContext {
            raw_ids,
            ..Default::default()
        };
        for doc in &documents {
            match doc.kind() {
                DocumentKind::Doc => context.docs.push(doc.clone()),
                DocumentKind::T2tDoc => context.t2t_docs.push(doc.clone()),
                DocumentKind::SqlExample => context.sql_examples.push(doc.clone()),
            }
        }
        context.documents = documents;
        context
    }
}

#[derive(Clone)]
pub struct HybridRetriever {
    lexical: Arc<LexicalIndex>,
    semantic: Option<SemanticSearcher>,
    fusion: RankFusion,
    config: RetrievalConfig,
}

impl HybridRetriever {
    pub fn new(
        lexical: Arc<LexicalIndex>,
        semantic: Option<SemanticSearcher>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            lexical,
            semantic,
            fusion: RankFusion::new(config.rrf_k),
            config,
        }
    }

    pub async fn search(&self, query: &str) -> HybridContext {
        let ((lexical, lexical_degraded), (semantic, semantic_degraded)) =
            tokio::join!(self.lexical_list(query), self.semantic_list(query));

        // Semantic first: equal-rank ties go to the semantic hit.
        let lists = [
            WeightedList {
                weight: self.config.semantic_weight,
                candidates: &semantic,
            },
            WeightedList {
                weight: self.config.lexical_weight,
                candidates: &lexical,
            },
        ];
        let fused = self.fusion.fuse_weighted(&lists, self.config.top_k);

        let documents: Vec<Document> = join_documents(&fused, self.lexical.as_ref())
            .into_iter()
            .cloned()
            .collect();

        tracing::debug!(
            "Hybrid search: {} lexical, {} semantic, {} fused, {} joined",
            lexical.len(),
            semantic.len(),
            fused.len(),
            documents.len()
        );

        let mut context = HybridContext::from_documents(documents, fused.ids());
        context.lexical_degraded = lexical_degraded;
        context.semantic_degraded = semantic_degraded;
        context
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    async fn lexical_list(&self, query: &str) -> (Vec<Candidate>, bool) {
        let index = self.lexical.clone();
        let query = query.to_string();
        let top_k = self.config.semantic_top_k;
        let task = tokio::task::spawn_blocking(move || index.search(&query, top_k));

        match tokio::time::timeout(self.timeout(), task).await {
            Ok(Ok(candidates)) => (candidates, false),
            Ok(Err(e)) => {
                tracing::warn!("Lexical search task failed: {}", e);
                (Vec::new(), true)
            }
            Err(_) => {
                tracing::warn!(
                    "Lexical search timed out after {}s",
                    self.config.timeout_secs
                );
                (Vec::new(), true)
            }
        }
    }

    async fn semantic_list(&self, query: &str) -> (Vec<Candidate>, bool) {
        let Some(semantic) = &self.semantic else {
            return (Vec::new(), false);
        };

        let search = semantic.search_merged(
            query,
            &self.config.semantic_collections,
            self.config.semantic_top_k,
        );
        match tokio::time::timeout(self.timeout(), search).await {
            Ok(Ok(hits)) => (hits.into_iter().map(|hit| hit.candidate).collect(), false),
            Ok(Err(e)) => {
                tracing::warn!("Semantic search failed, continuing lexical-only: {}", e);
                (Vec::new(), true)
            }
            Err(_) => {
                tracing::warn!(
                    "Semantic search timed out after {}s",
                    self.config.timeout_secs
                );
                (Vec::new(), true)
            }
        }
    }
}
