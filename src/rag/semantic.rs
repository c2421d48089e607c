//! Semantic search adapter.
//!
//! Embeds the query once, asks the vector search collaborator for the nearest
//! entries of every collection concurrently and converts distances into
//! [`Candidate`]s with `score = 1 / (1 + distance)`. No ranking happens here
//! beyond that transform.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};

use super::fusion::Candidate;
use crate::core::errors::EngineError;

/// Raw answer of a vector search collaborator, aligned by index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorHits {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub distances: Vec<f64>,
}

impl VectorHits {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Nearest-neighbour lookup in a named collection.
///
/// Implementations must return empty vectors for an empty or unknown
/// collection rather than an error.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        n_results: usize,
    ) -> Result<VectorHits, EngineError>;
}

#[async_trait]
pub trait QueryEmbedder: Send + Sync {
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, EngineError>;
}

/// A semantic candidate together with the text the collaborator returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticHit {
    pub candidate: Candidate,
    pub text: String,
    pub distance: f64,
    pub collection: String,
}

pub fn distance_to_score(distance: f64) -> f64 {
    1.0 / (1.0 + distance)
}

#[derive(Clone)]
pub struct SemanticSearcher {
    embedder: Arc<dyn QueryEmbedder>,
    store: Arc<dyn VectorSearch>,
}

impl SemanticSearcher {
    pub fn new(embedder: Arc<dyn QueryEmbedder>, store: Arc<dyn VectorSearch>) -> Self {
        Self { embedder, store }
    }

    /// Per-collection candidate lists, each in the collaborator's order.
    pub async fn search(
        &self,
        query: &str,
        collections: &[String],
        top_k: usize,
    ) -> Result<HashMap<String, Vec<Candidate>>, EngineError> {
        let hits = self.collect_hits(query, collections, top_k).await?;

        let mut by_collection: HashMap<String, Vec<Candidate>> = collections
            .iter()
            .map(|name| (name.clone(), Vec::new()))
            .collect();
        for hit in hits {
            by_collection
                .entry(hit.collection)
                .or_default()
                .push(hit.candidate);
        }
        Ok(by_collection)
    }

    /// Queries every collection and merges the answers into one list:
    /// duplicates keep their smallest distance, the list is ordered by
    /// ascending distance and truncated to `top_k`.
    pub async fn search_merged(
        &self,
        query: &str,
        collections: &[String],
        top_k: usize,
    ) -> Result<Vec<SemanticHit>, EngineError> {
        let hits = self.collect_hits(query, collections, top_k).await?;

        let mut merged: Vec<SemanticHit> = Vec::with_capacity(hits.len());
        let mut slots: HashMap<String, usize> = HashMap::new();
        for hit in hits {
            match slots.get(&hit.candidate.id) {
                Some(&slot) => {
                    if hit.distance < merged[slot].distance {
                        merged[slot] = hit;
                    }
                }
                None => {
                    slots.insert(hit.candidate.id.clone(), merged.len());
                    merged.push(hit);
                }
            }
        }

        merged.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        merged.truncate(top_k);
        for (rank, hit) in merged.iter_mut().enumerate() {
            hit.candidate.rank = rank;
        }
        Ok(merged)
    }

    async fn collect_hits(
        &self,
        query: &str,
        collections: &[String],
        top_k: usize,
    ) -> Result<Vec<SemanticHit>, EngineError> {
        if collections.is_empty() || top_k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed_query(query).await?;

        let answers = try_join_all(
            collections
                .iter()
                .map(|collection| self.store.query(collection, &embedding, top_k)),
        )
        .await?;

        Ok(collections
            .iter()
            .zip(answers)
            .flat_map(|(collection, raw)| to_hits(collection, raw))
            .collect())
    }
}

fn to_hits(collection: &str, raw: VectorHits) -> Vec<SemanticHit> {
    let aligned = raw.ids.len().min(raw.documents.len()).min(raw.distances.len());
    if aligned != raw.ids.len() || aligned != raw.documents.len() || aligned != raw.distances.len()
    {
        tracing::warn!(
            "Collection '{}' returned misaligned results (ids={}, documents={}, distances={}); keeping {}",
            collection,
            raw.ids.len(),
            raw.documents.len(),
            raw.distances.len(),
            aligned
        );
    }

    raw.ids
        .into_iter()
        .zip(raw.documents)
        .zip(raw.distances)
        .enumerate()
        .map(|(rank, ((id, text), distance))| SemanticHit {
            candidate: Candidate {
                id,
                score: distance_to_score(distance),
                rank,
            },
            text,
            distance,
            collection: collection.to_string(),
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) struct FixedEmbedder;

    #[async_trait]
    impl QueryEmbedder for FixedEmbedder {
        async fn embed_query(&self, _query: &str) -> Result<Vec<f32>, EngineError> {
            Ok(vec![0.1, 0.2, 0.3])
        }
    }

    #[derive(Default)]
    pub(crate) struct MapStore {
        pub(crate) collections: HashMap<String, VectorHits>,
        pub(crate) calls: AtomicUsize,
    }

    impl MapStore {
        pub(crate) fn with(mut self, name: &str, entries: &[(&str, &str, f64)]) -> Self {
            self.collections.insert(
                name.to_string(),
                VectorHits {
                    ids: entries.iter().map(|e| e.0.to_string()).collect(),
                    documents: entries.iter().map(|e| e.1.to_string()).collect(),
                    distances: entries.iter().map(|e| e.2).collect(),
                },
            );
            self
        }
    }

    #[async_trait]
    impl VectorSearch for MapStore {
        async fn query(
            &self,
            collection: &str,
            _embedding: &[f32],
            n_results: usize,
        ) -> Result<VectorHits, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut hits = self.collections.get(collection).cloned().unwrap_or_default();
            hits.ids.truncate(n_results);
            hits.documents.truncate(n_results);
            hits.distances.truncate(n_results);
            Ok(hits)
        }
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl QueryEmbedder for BrokenEmbedder {
        async fn embed_query(&self, _query: &str) -> Result<Vec<f32>, EngineError> {
            Err(EngineError::collaborator("embedding endpoint unreachable"))
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn score_decreases_with_distance() {
        assert_eq!(distance_to_score(0.0), 1.0);
        assert!((distance_to_score(1.0) - 0.5).abs() < 1e-12);
        assert!(distance_to_score(0.2) > distance_to_score(0.8));
    }

    #[tokio::test]
    async fn search_groups_candidates_by_collection() {
        let store = MapStore::default()
            .with("docs", &[("d1", "users table", 0.1), ("d2", "orders table", 0.4)])
            .with("sql_examples", &[("s1", "Question: ...", 0.3)]);
        let searcher = SemanticSearcher::new(Arc::new(FixedEmbedder), Arc::new(store));

        let result = searcher
            .search("users", &names(&["docs", "sql_examples", "empty"]), 5)
            .await
            .unwrap();

        assert_eq!(result["docs"].len(), 2);
        assert_eq!(result["docs"][0].id, "d1");
        assert_eq!(result["docs"][1].rank, 1);
        assert!((result["docs"][0].score - 1.0 / 1.1).abs() < 1e-12);
        assert_eq!(result["sql_examples"][0].id, "s1");
        assert!(result["empty"].is_empty());
    }

    #[tokio::test]
    async fn merged_keeps_smallest_distance_per_id() {
        let store = MapStore::default()
            .with("docs", &[("a", "alpha", 0.5), ("b", "beta", 0.2)])
            .with("sql_examples", &[("a", "alpha", 0.1), ("c", "gamma", 0.9)]);
        let searcher = SemanticSearcher::new(Arc::new(FixedEmbedder), Arc::new(store));

        let merged = searcher
            .search_merged("q", &names(&["docs", "sql_examples"]), 2)
            .await
            .unwrap();

        let ids: Vec<&str> = merged.iter().map(|h| h.candidate.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(merged[0].distance, 0.1);
        assert_eq!(merged[0].collection, "sql_examples");
        assert_eq!(merged[1].candidate.rank, 1);
    }

    #[tokio::test]
    async fn misaligned_arrays_are_truncated() {
        let mut store = MapStore::default();
        store.collections.insert(
            "docs".to_string(),
            VectorHits {
                ids: names(&["a", "b", "c"]),
                documents: names(&["alpha", "beta"]),
                distances: vec![0.1, 0.2, 0.3],
            },
        );
        let searcher = SemanticSearcher::new(Arc::new(FixedEmbedder), Arc::new(store));

        let result = searcher.search("q", &names(&["docs"]), 5).await.unwrap();
        assert_eq!(result["docs"].len(), 2);
    }

    #[tokio::test]
    async fn blank_query_skips_the_collaborator() {
        let store = Arc::new(MapStore::default().with("docs", &[("a", "alpha", 0.1)]));
        let searcher = SemanticSearcher::new(Arc::new(FixedEmbedder), store.clone());

        let merged = searcher
            .search_merged("   ", &names(&["docs"]), 5)
            .await
            .unwrap();
        assert!(merged.is_empty());
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn embedder_failure_is_reported() {
        let searcher =
            SemanticSearcher::new(Arc::new(BrokenEmbedder), Arc::new(MapStore::default()));
        let err = searcher
            .search_merged("q", &names(&["docs"]), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Collaborator(_)));
    }
}
