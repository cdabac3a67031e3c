//! Streaming ingestion pipeline (C8): validate, detect language, summarize,
//! tag, embed, then commit lexical-then-vector, emitting progress over the
//! typed event bus at every stage.

pub mod pipeline;
pub mod prompts;

pub use pipeline::{IngestionPipeline, MAX_CONTENT_LEN};
