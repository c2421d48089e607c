//! Query understanding ahead of retrieval.

pub mod enhancer;

pub use enhancer::{EnhancedQuery, QueryEnhancer};
