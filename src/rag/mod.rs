//! Hybrid retrieval over a document knowledge base.
//!
//! - `LexicalIndex`: BM25 keyword index over an immutable corpus snapshot
//! - `SemanticSearcher`: adapter around an external vector search collaborator
//! - `RankFusion`: Reciprocal Rank Fusion of the candidate lists
//! - `HybridRetriever`: runs both strategies and buckets the fused documents

pub mod context_builder;
pub mod corpus;
pub mod document;
pub mod fusion;
pub mod hybrid;
pub mod lexical;
pub mod semantic;

pub use context_builder::{format_sql_context, format_text_context, ContextBuilder};
pub use corpus::{CorpusProvider, StaticCorpus};
pub use document::{Document, DocumentKind, DocumentLookup, DocumentMetadata};
pub use fusion::{join_documents, Candidate, FusedHit, FusedResult, RankFusion, WeightedList};
pub use hybrid::{HybridContext, HybridRetriever};
pub use lexical::LexicalIndex;
pub use semantic::{QueryEmbedder, SemanticHit, SemanticSearcher, VectorHits, VectorSearch};
