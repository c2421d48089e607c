//! Reciprocal Rank Fusion (RRF) across independently ranked candidate lists.
//!
//! For each document `d`:
//!
//! ```text
//! rrf(d) = Σ weight_i / (k + rank_i(d) + 1)
//! ```
//!
//! where `rank_i(d)` is the 0-based position of `d` in list `i`. Lists that do
//! not contain `d` contribute nothing. A document found by several strategies
//! accumulates every contribution.
//!
//! Equal fused scores keep the order in which documents were first seen while
//! walking the lists in caller order, so the output is deterministic.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::document::{Document, DocumentLookup};

pub const DEFAULT_RRF_K: u32 = 60;

/// A scored reference to a document within one strategy's result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub score: f64,
    /// 0-based position within the source list.
    pub rank: usize,
}

impl Candidate {
    pub fn new(id: impl Into<String>, score: f64, rank: usize) -> Self {
        Self {
            id: id.into(),
            score,
            rank,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedHit {
    pub id: String,
    pub fused_score: f64,
}

/// Fused ranking, descending by `fused_score`, without duplicate ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FusedResult {
    pub hits: Vec<FusedHit>,
}

impl FusedResult {
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.hits.iter().map(|hit| hit.id.clone()).collect()
    }
}

/// One ranked list with its fusion weight.
#[derive(Debug, Clone, Copy)]
pub struct WeightedList<'a> {
    pub weight: f64,
    pub candidates: &'a [Candidate],
}

#[derive(Debug, Clone, Copy)]
pub struct RankFusion {
    k: f64,
}

impl Default for RankFusion {
    fn default() -> Self {
        Self::new(DEFAULT_RRF_K)
    }
}

impl RankFusion {
    pub fn new(k: u32) -> Self {
        Self { k: f64::from(k) }
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    /// Fuses equally weighted lists and keeps the best `top_k`.
    pub fn fuse(&self, lists: &[Vec<Candidate>], top_k: usize) -> FusedResult {
        let weighted: Vec<WeightedList<'_>> = lists
            .iter()
            .map(|candidates| WeightedList {
                weight: 1.0,
                candidates,
            })
            .collect();
        self.fuse_weighted(&weighted, top_k)
    }

    pub fn fuse_weighted(&self, lists: &[WeightedList<'_>], top_k: usize) -> FusedResult {
        let mut order: Vec<FusedHit> = Vec::new();
        let mut slots: HashMap<&str, usize> = HashMap::new();

        for list in lists {
            for (rank, candidate) in list.candidates.iter().enumerate() {
                let contribution = list.weight / (self.k + rank as f64 + 1.0);
                match slots.get(candidate.id.as_str()) {
                    Some(&slot) => order[slot].fused_score += contribution,
                    None => {
                        slots.insert(candidate.id.as_str(), order.len());
                        order.push(FusedHit {
                            id: candidate.id.clone(),
                            fused_score: contribution,
                        });
                    }
                }
            }
        }

        // Stable: ties stay in first-encounter order.
        order.sort_by(|a, b| b.fused_score.total_cmp(&a.fused_score));
        order.truncate(top_k);

        FusedResult { hits: order }
    }
}

/// Resolves fused ids to documents, in fused order. Ids the lookup does not
/// know are stale references and are skipped.
pub fn join_documents<'a, L>(fused: &FusedResult, lookup: &'a L) -> Vec<&'a Document>
where
    L: DocumentLookup + ?Sized,
{
    let mut documents = Vec::with_capacity(fused.len());
    for hit in &fused.hits {
        match lookup.document(&hit.id) {
            Some(doc) => documents.push(doc),
            None => tracing::warn!("Dropping fused id '{}': no matching document", hit.id),
        }
    }
    documents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::document::DocumentKind;

    fn list(ids: &[&str]) -> Vec<Candidate> {
        ids.iter()
            .enumerate()
            .map(|(rank, id)| Candidate::new(*id, 1.0 / (rank as f64 + 1.0), rank))
            .collect()
    }

    #[test]
    fn multi_list_agreement_is_additive() {
        let lists = vec![
            vec![Candidate::new("a", 1.0, 0), Candidate::new("b", 0.5, 1)],
            vec![Candidate::new("b", 1.0, 0)],
        ];

        let fused = RankFusion::new(60).fuse(&lists, 2);

        assert_eq!(fused.ids(), vec!["b", "a"]);
        let b = fused.hits[0].fused_score;
        let a = fused.hits[1].fused_score;
        assert!((b - (1.0 / 62.0 + 1.0 / 61.0)).abs() < 1e-12);
        assert!((a - 1.0 / 61.0).abs() < 1e-12);
    }

    #[test]
    fn top_of_both_lists_beats_top_of_one() {
        let lists = vec![list(&["x", "y"]), list(&["x", "z"])];
        let fused = RankFusion::default().fuse(&lists, 10);

        let x = fused.hits.iter().find(|h| h.id == "x").unwrap().fused_score;
        let y = fused.hits.iter().find(|h| h.id == "y").unwrap().fused_score;
        assert!(x > y);
        assert!((x - 2.0 / 61.0).abs() < 1e-12);
    }

    #[test]
    fn ties_keep_first_encounter_order() {
        let lists = vec![list(&["p", "q"]), list(&["r", "s"])];
        let fused = RankFusion::default().fuse(&lists, 10);

        // p and r tie at rank 0, q and s at rank 1.
        assert_eq!(fused.ids(), vec!["p", "r", "q", "s"]);
    }

    #[test]
    fn fusion_is_deterministic_and_deduplicated() {
        let lists = vec![list(&["a", "b", "c", "d"]), list(&["d", "c", "e"]), list(&["c"])];
        let first = RankFusion::default().fuse(&lists, 10);
        for _ in 0..20 {
            assert_eq!(RankFusion::default().fuse(&lists, 10), first);
        }

        let mut ids = first.ids();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), first.len());
        assert_eq!(first.hits[0].id, "c");
    }

    #[test]
    fn truncates_to_top_k_or_returns_all() {
        let lists = vec![list(&["a", "b", "c"])];
        assert_eq!(RankFusion::default().fuse(&lists, 2).len(), 2);
        assert_eq!(RankFusion::default().fuse(&lists, 10).len(), 3);
        assert!(RankFusion::default().fuse(&[], 5).is_empty());
        assert!(RankFusion::default().fuse(&[Vec::new(), Vec::new()], 5).is_empty());
    }

    #[test]
    fn weights_scale_contributions() {
        let lexical = list(&["a"]);
        let semantic = list(&["b"]);
        let fused = RankFusion::default().fuse_weighted(
            &[
                WeightedList {
                    weight: 0.5,
                    candidates: &lexical,
                },
                WeightedList {
                    weight: 1.0,
                    candidates: &semantic,
                },
            ],
            5,
        );
        assert_eq!(fused.ids(), vec!["b", "a"]);
    }

    #[test]
    fn join_drops_unknown_ids() {
        let mut lookup = HashMap::new();
        lookup.insert(
            "a".to_string(),
            Document::new("a", "alpha", DocumentKind::Doc, "a.md"),
        );
        let fused = RankFusion::default().fuse(&[list(&["ghost", "a"])], 5);

        let docs = join_documents(&fused, &lookup);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "a");
    }
}
