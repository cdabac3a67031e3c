//! # Embedded HNSW vector index
//!
//! An in-process implementation of C6 (§4.6): a dense-vector
//! nearest-neighbor store keyed by article id, using
//! [hnsw_rs](https://crates.io/crates/hnsw_rs) for approximate
//! nearest-neighbor search over cosine similarity.
//!
//! Payload is intentionally minimal — a language code and the original
//! article id — all article content lives in the lexical index (C5).
//! `hnsw_rs` has no true point deletion: [`HnswVectorIndex::delete`] only
//! removes the id from the side metadata map, leaving an orphaned vector
//! physically present in the graph. This is not a shortcut; it is exactly
//! the "vector-only orphan" the hybrid retriever is specified to tolerate
//! by dropping hits that fail to hydrate against the lexical index.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lorekeeper_core::traits::VectorIndex;
//! use lorekeeper_vector::{HnswVectorIndex, VectorIndexConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let index = HnswVectorIndex::new(VectorIndexConfig::default());
//!     index.upsert("article-1", &vec![0.1; 768], "en").await?;
//!     let hits = index.search(&vec![0.1; 768], 5, None).await?;
//!     Ok(())
//! }
//! ```

pub mod index;

pub use index::{HnswVectorIndex, VectorIndexConfig};
