//! Shared data model, trait boundaries, error type, configuration, and
//! retry helpers for the lorekeeper workspace.
//!
//! Every other crate in this workspace depends on `lorekeeper-core` and
//! implements one or more of the traits in [`traits`] against a concrete
//! backend (OpenAI, an embedded HNSW graph, an embedded BM25 index, …).

pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod retry;
pub mod traits;

pub use error::{Error, Result};
