//! Hybrid retrieval and query-safety engine.
//!
//! Questions are optionally rewritten by the query enhancer, retrieved with
//! BM25 and vector search fused by Reciprocal Rank Fusion, turned into SQL or
//! free text by a generation collaborator, and generated SQL only reaches the
//! database through the read-only statement gate.

pub mod core;
pub mod llm;
pub mod query;
pub mod rag;
pub mod service;
pub mod sql;
pub mod state;

pub use crate::core::config::{AppPaths, ConfigService, EngineConfig};
pub use crate::core::errors::EngineError;
pub use crate::state::{Collaborators, EngineContext};
