//! Hybrid retriever (C9): parallel lexical + vector search, score fusion,
//! and hydration against the lexical index.

pub mod fusion;
pub mod retriever;

pub use retriever::{HybridRetriever, RetrievalOutcome};
