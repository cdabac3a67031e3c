//! The seven-stage ingestion pipeline (§4.8): validate, detect language,
//! summarize, tag, embed, commit lexical, commit vector.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use uuid::Uuid;

use lorekeeper_core::error::{Error, Result};
use lorekeeper_core::events::{Event, Progress};
use lorekeeper_core::model::{Article, Caller, NewArticle};
use lorekeeper_core::traits::{Embeddings, Generator, LanguageDetector, LexicalIndex, VectorIndex};
use lorekeeper_observability::Metrics;
use lorekeeper_streaming::EventSender;

use crate::prompts;

/// Maximum accepted content length, in UTF-8 characters.
pub const MAX_CONTENT_LEN: usize = 200_000;

pub struct IngestionPipeline {
    detector: Arc<dyn LanguageDetector>,
    embedder: Arc<dyn Embeddings>,
    generator: Arc<dyn Generator>,
    lexical: Arc<dyn LexicalIndex>,
    vector: Arc<dyn VectorIndex>,
    concurrency: Arc<Semaphore>,
    metrics: Arc<Metrics>,
}

impl IngestionPipeline {
    #[must_use]
    pub fn new(
        detector: Arc<dyn LanguageDetector>,
        embedder: Arc<dyn Embeddings>,
        generator: Arc<dyn Generator>,
        lexical: Arc<dyn LexicalIndex>,
        vector: Arc<dyn VectorIndex>,
        max_concurrent: usize,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            detector,
            embedder,
            generator,
            lexical,
            vector,
            concurrency: Arc::new(Semaphore::new(max_concurrent.max(1))),
            metrics,
        }
    }

    pub async fn ingest(
        &self,
        caller: &Caller,
        raw: NewArticle,
        events: &EventSender,
    ) -> Result<String> {
        let _permit = self
            .concurrency
            .acquire()
            .await
            .map_err(|_| Error::internal("ingestion concurrency semaphore closed"))?;

        match self.run(caller, raw, events).await {
            Ok(id) => {
                self.metrics.ingestions_total.inc();
                events.send(Event::Success(serde_json::json!(id))).await?;
                events.send(Event::done(None)).await?;
                Ok(id)
            }
            Err(e) => {
                self.metrics.ingestions_failed_total.inc();
                events.send(Event::error(e.category())).await.ok();
                Err(e)
            }
        }
    }

    async fn run(&self, caller: &Caller, raw: NewArticle, events: &EventSender) -> Result<String> {
        // 1. Validate (0-5%)
        events.send(Event::status("validating")).await?;
        if raw.title.trim().is_empty() || raw.content.trim().is_empty() {
            return Err(Error::validation("title and content must be non-empty"));
        }
        if raw.content.chars().count() > MAX_CONTENT_LEN {
            return Err(Error::validation(format!(
                "content exceeds {MAX_CONTENT_LEN} characters"
            )));
        }
        let registrar = caller.require()?.to_string();
        let id = Uuid::new_v4().to_string();
        let created_date = raw.created_date.unwrap_or_else(Utc::now);
        events.send(Event::Progress(Progress::new("validate", 5, 100))).await?;

        // 2. Detect language (5-15%)
        events.send(Event::status("detecting language")).await?;
        let detect_input = format!("{} {}", raw.title, raw.content);
        let lang = self.detector.detect(&detect_input);
        events
            .send(Event::Progress(Progress::new("detect_language", 15, 100)))
            .await?;

        // 3. Summarize (15-40%)
        events.send(Event::status("summarizing")).await?;
        let summary_raw = self
            .generator
            .generate(&prompts::summarize_prompt(&raw.content, &lang))
            .await?;
        let summary = prompts::clamp_summary(&summary_raw);
        events
            .send(Event::Progress(Progress::new("summarize", 40, 100)))
            .await?;

        // 4. Tag (40-55%)
        events.send(Event::status("tagging")).await?;
        let tags_raw = self
            .generator
            .generate(&prompts::tag_prompt(&raw.content, &lang))
            .await?;
        let tags = prompts::parse_tags(&tags_raw);
        events.send(Event::Progress(Progress::new("tag", 55, 100))).await?;

        // 5. Embed (55-80%)
        events.send(Event::status("embedding")).await?;
        let title_embedding = self.embedder.embed(&raw.title).await?;
        let summary_embedding = self.embedder.embed(&summary).await?;
        events.send(Event::Progress(Progress::new("embed", 80, 100))).await?;

        let article = Article {
            id: id.clone(),
            title: raw.title,
            content: raw.content,
            summary,
            tags,
            lang: lang.clone(),
            author: raw.author,
            original_url: raw.original_url,
            created_date,
            registrar,
            title_embedding,
            summary_embedding,
        };

        // 6. Commit lexical (80-92%)
        events.send(Event::status("committing to lexical index")).await?;
        self.lexical.put(&article).await?;
        events
            .send(Event::Progress(Progress::new("commit_lexical", 92, 100)))
            .await?;

        // 7. Commit vector (92-100%)
        events.send(Event::status("committing to vector index")).await?;
        if let Err(e) = self
            .vector
            .upsert(&article.id, &article.summary_embedding, &article.lang)
            .await
        {
            // Best-effort rollback of the lexical commit (§3 cross-backend consistency).
            let _ = self.lexical.delete(&article.id).await;
            return Err(e);
        }
        events
            .send(Event::Progress(Progress::new("commit_vector", 100, 100)))
            .await?;

        Ok(article.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lorekeeper_core::model::{Hit, EMBEDDING_DIM};
    use std::sync::Mutex;

    struct FixedDetector;
    impl LanguageDetector for FixedDetector {
        fn detect(&self, _text: &str) -> String {
            "en".to_string()
        }
    }

    struct FixedEmbedder;
    #[async_trait]
    impl Embeddings for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.1; EMBEDDING_DIM])
        }
    }

    struct FixedGenerator {
        response: String,
    }
    #[async_trait]
    impl Generator for FixedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.response.clone())
        }
        async fn generate_stream(
            &self,
            _prompt: &str,
            _sink: &mut dyn lorekeeper_core::traits::GenerationSink,
        ) -> Result<String> {
            Ok(self.response.clone())
        }
    }

    struct FailingVector;
    #[async_trait]
    impl VectorIndex for FailingVector {
        async fn upsert(&self, _id: &str, _vector: &[f32], _lang: &str) -> Result<()> {
            Err(Error::upstream("vector backend down"))
        }
        async fn search(&self, _query: &[f32], _size: usize, _lang: Option<&str>) -> Result<Vec<(String, f32)>> {
            Ok(vec![])
        }
        async fn delete(&self, _id: &str) -> Result<()> {
            Ok(())
        }
    }

    struct InMemoryVector {
        upserted: Mutex<Vec<String>>,
    }
    #[async_trait]
    impl VectorIndex for InMemoryVector {
        async fn upsert(&self, id: &str, _vector: &[f32], _lang: &str) -> Result<()> {
            self.upserted.lock().unwrap().push(id.to_string());
            Ok(())
        }
        async fn search(&self, _query: &[f32], _size: usize, _lang: Option<&str>) -> Result<Vec<(String, f32)>> {
            Ok(vec![])
        }
        async fn delete(&self, _id: &str) -> Result<()> {
            Ok(())
        }
    }

    struct InMemoryLexical {
        articles: Mutex<std::collections::HashMap<String, Article>>,
    }
    #[async_trait]
    impl LexicalIndex for InMemoryLexical {
        async fn put(&self, article: &Article) -> Result<()> {
            self.articles
                .lock()
                .unwrap()
                .insert(article.id.clone(), article.clone());
            Ok(())
        }
        async fn delete(&self, id: &str) -> Result<()> {
            self.articles.lock().unwrap().remove(id);
            Ok(())
        }
        async fn get_by_id(&self, id: &str) -> Result<Option<Article>> {
            Ok(self.articles.lock().unwrap().get(id).cloned())
        }
        async fn search(&self, _query: &str, _lang: Option<&str>, _size: usize) -> Result<Vec<Hit>> {
            Ok(vec![])
        }
        async fn list_by_owner(
            &self,
            _owner: &str,
            _date_from: Option<chrono::DateTime<Utc>>,
            _date_to: Option<chrono::DateTime<Utc>>,
            _from: usize,
            _size: usize,
        ) -> Result<(usize, Vec<Article>)> {
            Ok((0, vec![]))
        }
    }

    fn new_article() -> NewArticle {
        NewArticle {
            title: "Rust Ownership".to_string(),
            content: "Ownership is Rust's core memory-safety mechanism.".to_string(),
            author: None,
            original_url: None,
            created_date: None,
        }
    }

    #[tokio::test]
    async fn successful_ingest_commits_to_both_indices() {
        let lexical = Arc::new(InMemoryLexical {
            articles: Mutex::new(std::collections::HashMap::new()),
        });
        let vector = Arc::new(InMemoryVector {
            upserted: Mutex::new(vec![]),
        });
        let pipeline = IngestionPipeline::new(
            Arc::new(FixedDetector),
            Arc::new(FixedEmbedder),
            Arc::new(FixedGenerator {
                response: "rust, ownership, memory-safety".to_string(),
            }),
            lexical.clone(),
            vector.clone(),
            4,
            Arc::new(Metrics::new().unwrap()),
        );
        let (tx, mut rx) = lorekeeper_streaming::channel();
        let caller = Caller::user("alice");

        let handle = tokio::spawn(async move { pipeline.ingest(&caller, new_article(), &tx).await });

        let mut events = Vec::new();
        while let Some(e) = rx.recv().await {
            let terminal = e.is_terminal();
            events.push(e);
            if terminal {
                break;
            }
        }

        let id = handle.await.unwrap().unwrap();
        assert!(lexical.articles.lock().unwrap().contains_key(&id));
        assert!(vector.upserted.lock().unwrap().contains(&id));
        assert!(matches!(events.last(), Some(Event::Done(_))));
    }

    #[tokio::test]
    async fn empty_title_is_validation_failed_before_any_commit() {
        let lexical = Arc::new(InMemoryLexical {
            articles: Mutex::new(std::collections::HashMap::new()),
        });
        let pipeline = IngestionPipeline::new(
            Arc::new(FixedDetector),
            Arc::new(FixedEmbedder),
            Arc::new(FixedGenerator {
                response: "tag".to_string(),
            }),
            lexical,
            Arc::new(InMemoryVector {
                upserted: Mutex::new(vec![]),
            }),
            4,
            Arc::new(Metrics::new().unwrap()),
        );
        let (tx, mut rx) = lorekeeper_streaming::channel();
        let caller = Caller::user("alice");
        let mut article = new_article();
        article.title = String::new();

        let handle = tokio::spawn(async move { pipeline.ingest(&caller, article, &tx).await });
        while rx.recv().await.is_some() {}
        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.category(), "ValidationFailed");
    }

    #[tokio::test]
    async fn vector_commit_failure_rolls_back_lexical_commit() {
        let lexical = Arc::new(InMemoryLexical {
            articles: Mutex::new(std::collections::HashMap::new()),
        });
        let pipeline = IngestionPipeline::new(
            Arc::new(FixedDetector),
            Arc::new(FixedEmbedder),
            Arc::new(FixedGenerator {
                response: "tag".to_string(),
            }),
            lexical.clone(),
            Arc::new(FailingVector),
            4,
            Arc::new(Metrics::new().unwrap()),
        );
        let (tx, mut rx) = lorekeeper_streaming::channel();
        let caller = Caller::user("alice");

        let handle = tokio::spawn(async move { pipeline.ingest(&caller, new_article(), &tx).await });
        while rx.recv().await.is_some() {}
        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.category(), "UpstreamUnavailable");
        assert!(lexical.articles.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn progress_events_are_monotonically_non_decreasing() {
        let lexical = Arc::new(InMemoryLexical {
            articles: Mutex::new(std::collections::HashMap::new()),
        });
        let pipeline = IngestionPipeline::new(
            Arc::new(FixedDetector),
            Arc::new(FixedEmbedder),
            Arc::new(FixedGenerator {
                response: "tag".to_string(),
            }),
            lexical,
            Arc::new(InMemoryVector {
                upserted: Mutex::new(vec![]),
            }),
            4,
            Arc::new(Metrics::new().unwrap()),
        );
        let (tx, mut rx) = lorekeeper_streaming::channel();
        let caller = Caller::user("alice");

        let handle = tokio::spawn(async move { pipeline.ingest(&caller, new_article(), &tx).await });

        let mut last_percent = 0.0f32;
        while let Some(e) = rx.recv().await {
            if let Event::Progress(p) = e {
                assert!(p.percent >= last_percent);
                last_percent = p.percent;
            }
        }
        handle.await.unwrap().unwrap();
    }
}
