//! OpenAI integration for lorekeeper
//!
//! This crate provides the `OpenAI`-backed implementations of the
//! Embedder (C2) and Generator (C3) trait boundaries defined in
//! `lorekeeper-core`.
//!
//! - [`OpenAiEmbedder`] — embeddings via `text-embedding-3-small`, pinned
//!   to a 768-dimension output.
//! - [`OpenAiGenerator`] — chat completions, synchronous or streamed, with
//!   the strict response-only prompt wrapper applied to every call.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use lorekeeper_core::traits::{Embeddings, Generator};
//! use lorekeeper_openai::{OpenAiEmbedder, OpenAiGenerator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let embedder = OpenAiEmbedder::try_new("text-embedding-3-small")?;
//!     let vector = embedder.embed("hello world").await?;
//!
//!     let generator = OpenAiGenerator::from_config(&Default::default())?;
//!     let answer = generator.generate("summarize: hello world").await?;
//!     Ok(())
//! }
//! ```

pub mod embeddings;
pub mod generator;

pub use embeddings::OpenAiEmbedder;
pub use generator::OpenAiGenerator;

// Re-export OpenAIConfig for callers building a client directly.
pub use async_openai::config::OpenAIConfig;
