//! BM25-Okapi keyword index over an immutable corpus snapshot.
//!
//! Documents and queries share one tokenizer: lowercase, then every run of
//! Unicode word characters (`\w+`) is a token. The index never changes after
//! `build`, so a shared `Arc<LexicalIndex>` can serve any number of
//! concurrent searches.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;

use super::document::{Document, DocumentLookup};
use super::fusion::Candidate;
use crate::core::config::LexicalConfig;
use crate::core::errors::EngineError;

fn word_regex() -> &'static Regex {
    static WORD_RE: OnceLock<Regex> = OnceLock::new();
    WORD_RE.get_or_init(|| Regex::new(r"\w+").expect("static regex is valid"))
}

pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    word_regex()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[derive(Debug)]
pub struct LexicalIndex {
    documents: Vec<Document>,
    positions: HashMap<String, usize>,
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<usize>,
    avg_doc_len: f64,
    idf: HashMap<String, f64>,
    params: LexicalConfig,
}

impl LexicalIndex {
    pub fn build(corpus: Vec<Document>) -> Result<Self, EngineError> {
        Self::build_with(corpus, LexicalConfig::default())
    }

    /// Builds the index. An empty corpus is valid and simply never matches;
    /// duplicate document ids are rejected.
    pub fn build_with(corpus: Vec<Document>, params: LexicalConfig) -> Result<Self, EngineError> {
        let mut positions = HashMap::with_capacity(corpus.len());
        for (idx, doc) in corpus.iter().enumerate() {
            if positions.insert(doc.id.clone(), idx).is_some() {
                return Err(EngineError::IndexBuild(format!(
                    "duplicate document id '{}'",
                    doc.id
                )));
            }
        }

        let mut term_freqs = Vec::with_capacity(corpus.len());
        let mut doc_lens = Vec::with_capacity(corpus.len());
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in &corpus {
            let tokens = tokenize(&doc.text);
            doc_lens.push(tokens.len());

            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *freqs.entry(token).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(freqs);
        }

        let total_len: usize = doc_lens.iter().sum();
        let avg_doc_len = if corpus.is_empty() {
            0.0
        } else {
            total_len as f64 / corpus.len() as f64
        };
        let idf = compute_idf(&doc_freq, corpus.len(), params.epsilon);

        tracing::info!(
            "Lexical index built: {} documents, {} terms",
            corpus.len(),
            idf.len()
        );

        Ok(Self {
            documents: corpus,
            positions,
            term_freqs,
            doc_lens,
            avg_doc_len,
            idf,
            params,
        })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Returns up to `top_k` documents with a positive score, best first.
    /// Equal scores keep corpus order.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<Candidate> {
        if self.documents.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let query_terms = tokenize(query);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f64)> = (0..self.documents.len())
            .map(|idx| (idx, self.score(idx, &query_terms)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        scored
            .into_iter()
            .enumerate()
            .map(|(rank, (idx, score))| Candidate {
                id: self.documents[idx].id.clone(),
                score,
                rank,
            })
            .collect()
    }

    fn score(&self, idx: usize, query_terms: &[String]) -> f64 {
        let freqs = &self.term_freqs[idx];
        let length_ratio = if self.avg_doc_len > 0.0 {
            self.doc_lens[idx] as f64 / self.avg_doc_len
        } else {
            0.0
        };
        let k1 = self.params.k1;
        let b = self.params.b;

        query_terms
            .iter()
            .map(|term| {
                let tf = freqs.get(term).copied().unwrap_or(0) as f64;
                if tf == 0.0 {
                    return 0.0;
                }
                let idf = self.idf.get(term).copied().unwrap_or(0.0);
                idf * (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * length_ratio))
            })
            .sum()
    }
}

impl DocumentLookup for LexicalIndex {
    fn document(&self, id: &str) -> Option<&Document> {
        self.positions.get(id).map(|&idx| &self.documents[idx])
    }
}

/// Okapi IDF; terms in more than half the corpus get a negative raw IDF,
/// which is replaced by `epsilon * mean(idf)`.
fn compute_idf(
    doc_freq: &HashMap<String, usize>,
    corpus_size: usize,
    epsilon: f64,
) -> HashMap<String, f64> {
    let n = corpus_size as f64;
    let mut idf = HashMap::with_capacity(doc_freq.len());
    let mut idf_sum = 0.0;
    let mut negative: HashSet<String> = HashSet::new();

    for (term, &freq) in doc_freq {
        let freq = freq as f64;
        let value = (n - freq + 0.5).ln() - (freq + 0.5).ln();
        idf_sum += value;
        if value < 0.0 {
            negative.insert(term.clone());
        }
        idf.insert(term.clone(), value);
    }

    if idf.is_empty() {
        return idf;
    }

    let floor = epsilon * (idf_sum / idf.len() as f64);
    for term in negative {
        idf.insert(term, floor);
    }
    idf
}
