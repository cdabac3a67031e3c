//! Trait boundaries for C1–C7: the pluggable collaborators the pipeline and
//! retriever are written against. Each crate in this workspace implements
//! one of these against an embedded or remote backend; callers depend only
//! on the trait.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{Article, ChatSession, ChatSessionSummary, Hit, Reference};

/// C2: produce a fixed-dimension, unit-normalizable vector from text.
#[async_trait]
pub trait Embeddings: Send + Sync {
    /// Embed a single string. Implementations batch internally where the
    /// upstream API allows it; callers needing batched throughput should
    /// prefer [`Embeddings::embed_many`].
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed many strings; the default forwards to [`Embeddings::embed`]
    /// one at a time. Implementations backed by a batching API should
    /// override this.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.embed(t).await?);
        }
        Ok(out)
    }
}

/// Receives incremental chunks from [`Generator::generate_stream`].
///
/// Returning `false` from [`GenerationSink::on_chunk`] requests
/// cancellation of the in-flight upstream call.
#[async_trait]
pub trait GenerationSink: Send {
    async fn on_chunk(&mut self, text_to_date: &str) -> bool;
}

/// C3: produce text from a prompt, either whole-response or streamed.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Synchronous full response.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Stream incremental output to `sink` until completion; returns the
    /// full accumulated answer. `sink` may request cancellation, which
    /// aborts the upstream call and surfaces [`crate::error::Error::Cancelled`].
    async fn generate_stream(
        &self,
        prompt: &str,
        sink: &mut dyn GenerationSink,
    ) -> Result<String>;
}

/// The strict directive every [`Generator`] prompt is wrapped with (§4.3).
///
/// Kept as a free function rather than a default-method body so both the
/// `generate` and `generate_stream` call sites apply it identically.
#[must_use]
pub fn wrap_prompt(task: &str) -> String {
    format!(
        "{task}\n\nRespond ONLY with the requested content. Do not add \
         explanations, preambles, or commentary outside of what was asked for."
    )
}

/// C6: dense-vector nearest-neighbor store keyed by article id.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(&self, id: &str, vector: &[f32], lang: &str) -> Result<()>;

    /// Cosine-similarity search; `lang` optionally restricts the candidate
    /// set to a single language.
    async fn search(
        &self,
        query: &[f32],
        size: usize,
        lang: Option<&str>,
    ) -> Result<Vec<(String, f32)>>;

    async fn delete(&self, id: &str) -> Result<()>;
}

/// C5: per-language-analyzed full-text store over article fields.
#[async_trait]
pub trait LexicalIndex: Send + Sync {
    /// Idempotent by `article.id`.
    async fn put(&self, article: &Article) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Article>>;

    async fn search(&self, query: &str, lang: Option<&str>, size: usize) -> Result<Vec<Hit>>;

    async fn list_by_owner(
        &self,
        owner: &str,
        date_from: Option<DateTime<Utc>>,
        date_to: Option<DateTime<Utc>>,
        from: usize,
        size: usize,
    ) -> Result<(usize, Vec<Article>)>;
}

/// C7: append-only chat-session log keyed by session id and owner.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, owner: &str, title: &str) -> Result<String>;

    async fn append_turn(
        &self,
        id: &str,
        user_msg: &str,
        assistant_msg: &str,
        sources: Vec<Reference>,
    ) -> Result<()>;

    async fn get(&self, id: &str) -> Result<ChatSession>;

    async fn list_by_owner(
        &self,
        owner: &str,
        page: usize,
        size: usize,
    ) -> Result<Vec<ChatSessionSummary>>;

    /// Fails with [`crate::error::Error::PermissionDenied`] if `owner` does
    /// not match the session's recorded owner.
    async fn delete(&self, id: &str, owner: &str) -> Result<()>;
}

/// C1: classify text into one of the eight supported language codes. Total
/// (no error path): unclassifiable or too-short input maps to `en`.
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> String;
}

/// The result of parsing a document byte stream (C4).
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    pub title: String,
    pub content: String,
    pub metadata: HashMap<String, String>,
}

/// C4: convert a document byte stream and filename into `(title, content)`
/// regardless of source format.
pub trait DocumentParser: Send + Sync {
    fn parse(&self, bytes: &[u8], filename: &str) -> Result<ParsedDocument>;
}
