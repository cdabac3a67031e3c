//! The hybrid retriever (C9): `retrieve(queryText, size) → [Reference]`.

use std::sync::Arc;

use lorekeeper_core::config::FusionConfig;
use lorekeeper_core::error::{Error, Result};
use lorekeeper_core::model::Reference;
use lorekeeper_core::traits::{Embeddings, LanguageDetector, LexicalIndex, VectorIndex};
use lorekeeper_observability::Metrics;

use crate::fusion::fuse;

/// Minimum candidate-set size requested from each backend, independent of
/// the caller's requested result `size` (§4.9 step 3/4, `K = max(size, 20)`).
const MIN_CANDIDATES: usize = 20;

pub struct HybridRetriever {
    detector: Arc<dyn LanguageDetector>,
    embedder: Arc<dyn Embeddings>,
    lexical: Arc<dyn LexicalIndex>,
    vector: Arc<dyn VectorIndex>,
    fusion: FusionConfig,
    metrics: Arc<Metrics>,
}

/// Result of a retrieval call, carrying whether either backend degraded.
#[derive(Debug, Clone, Default)]
pub struct RetrievalOutcome {
    pub references: Vec<Reference>,
    pub degraded: bool,
}

impl HybridRetriever {
    #[must_use]
    pub fn new(
        detector: Arc<dyn LanguageDetector>,
        embedder: Arc<dyn Embeddings>,
        lexical: Arc<dyn LexicalIndex>,
        vector: Arc<dyn VectorIndex>,
        fusion: FusionConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            detector,
            embedder,
            lexical,
            vector,
            fusion,
            metrics,
        }
    }

    pub async fn retrieve(&self, query_text: &str, size: usize) -> Result<RetrievalOutcome> {
        let timer = self.metrics.retrieval_latency_seconds.start_timer();
        let lang = self.detector.detect(query_text);
        let k = size.max(MIN_CANDIDATES);

        // Embed (C2) runs concurrently with lexical search (§4.9 step 2/3);
        // vector search then awaits the resolved embedding.
        let (embed_result, lex_result) = tokio::join!(
            self.embedder.embed(query_text),
            self.lexical.search(query_text, Some(&lang), k),
        );
        let query_vec = embed_result?;
        let vec_result = self.vector.search(&query_vec, k, Some(&lang)).await;

        let mut degraded = false;
        let lexical_hits = match lex_result {
            Ok(hits) => hits.into_iter().map(|h| (h.article.id, h.score)).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "lexical search failed, degrading to vector-only");
                degraded = true;
                Vec::new()
            }
        };
        let vector_hits = match vec_result {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(error = %e, "vector search failed, degrading to lexical-only");
                degraded = true;
                Vec::new()
            }
        };

        if lexical_hits.is_empty() && vector_hits.is_empty() && degraded {
            return Err(Error::RetrievalUnavailable);
        }

        let fused = fuse(&lexical_hits, &vector_hits, &self.fusion);

        let mut references = Vec::with_capacity(size);
        for candidate in fused {
            if references.len() == size {
                break;
            }
            // Hydrate from the lexical index; a fused id with no lexical
            // payload is a vector-only orphan and is dropped (§4.9 step 6).
            if let Some(article) = self.lexical.get_by_id(&candidate.id).await? {
                references.push(Reference {
                    article,
                    score: candidate.fused,
                });
            }
        }

        if degraded {
            self.metrics.retrieval_degraded_total.inc();
        }

        Ok(RetrievalOutcome { references, degraded })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use lorekeeper_core::model::{Article, Hit, EMBEDDING_DIM};

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

    fn article(id: &str) -> Article {
        Article {
            id: id.to_string(),
            title: format!("title {id}"),
            content: "content".to_string(),
            summary: "summary".to_string(),
            tags: vec![],
            lang: "en".to_string(),
            author: None,
            original_url: None,
            created_date: Utc::now(),
            registrar: "alice".to_string(),
            title_embedding: vec![],
            summary_embedding: vec![],
        }
    }

    struct FakeLexical {
        hits: Vec<Hit>,
        fail: bool,
    }
    #[async_trait]
    impl LexicalIndex for FakeLexical {
        async fn put(&self, _article: &Article) -> Result<()> {
            Ok(())
        }
        async fn delete(&self, _id: &str) -> Result<()> {
            Ok(())
        }
        async fn get_by_id(&self, id: &str) -> Result<Option<Article>> {
            Ok(self.hits.iter().find(|h| h.article.id == id).map(|h| h.article.clone()))
        }
        async fn search(&self, _query: &str, _lang: Option<&str>, _size: usize) -> Result<Vec<Hit>> {
            if self.fail {
                return Err(Error::upstream("lexical down"));
            }
            Ok(self.hits.clone())
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

    struct FakeVector {
        hits: Vec<(String, f32)>,
        fail: bool,
    }
    #[async_trait]
    impl VectorIndex for FakeVector {
        async fn upsert(&self, _id: &str, _vector: &[f32], _lang: &str) -> Result<()> {
            Ok(())
        }
        async fn search(&self, _query: &[f32], _size: usize, _lang: Option<&str>) -> Result<Vec<(String, f32)>> {
            if self.fail {
                return Err(Error::upstream("vector down"));
            }
            Ok(self.hits.clone())
        }
        async fn delete(&self, _id: &str) -> Result<()> {
            Ok(())
        }
    }

    fn fusion() -> FusionConfig {
        FusionConfig {
            alpha_lexical: 0.5,
            beta_vector: 0.5,
        }
    }

    #[tokio::test]
    async fn fused_result_hydrates_and_preserves_order() {
        let lexical = Arc::new(FakeLexical {
            hits: vec![
                Hit { article: article("a"), score: 10.0 },
                Hit { article: article("b"), score: 5.0 },
            ],
            fail: false,
        });
        let vector = Arc::new(FakeVector {
            hits: vec![("a".to_string(), 1.0)],
            fail: false,
        });
        let retriever = HybridRetriever::new(
            Arc::new(FixedDetector),
            Arc::new(FixedEmbedder),
            lexical,
            vector,
            fusion(),
            Arc::new(Metrics::new().unwrap()),
        );

        let outcome = retriever.retrieve("rust ownership", 2).await.unwrap();
        assert!(!outcome.degraded);
        assert_eq!(outcome.references.len(), 2);
        assert_eq!(outcome.references[0].article.id, "a");
    }

    #[tokio::test]
    async fn vector_only_orphan_is_dropped_at_hydration() {
        let lexical = Arc::new(FakeLexical {
            hits: vec![Hit { article: article("a"), score: 10.0 }],
            fail: false,
        });
        let vector = Arc::new(FakeVector {
            hits: vec![("a".to_string(), 1.0), ("orphan".to_string(), 2.0)],
            fail: false,
        });
        let retriever = HybridRetriever::new(
            Arc::new(FixedDetector),
            Arc::new(FixedEmbedder),
            lexical,
            vector,
            fusion(),
            Arc::new(Metrics::new().unwrap()),
        );

        let outcome = retriever.retrieve("rust", 5).await.unwrap();
        assert_eq!(outcome.references.len(), 1);
        assert_eq!(outcome.references[0].article.id, "a");
    }

    #[tokio::test]
    async fn lexical_failure_degrades_to_vector_only() {
        let lexical = Arc::new(FakeLexical {
            hits: vec![Hit { article: article("a"), score: 10.0 }],
            fail: true,
        });
        let vector = Arc::new(FakeVector {
            hits: vec![("a".to_string(), 1.0)],
            fail: false,
        });
        let retriever = HybridRetriever::new(
            Arc::new(FixedDetector),
            Arc::new(FixedEmbedder),
            lexical,
            vector,
            fusion(),
            Arc::new(Metrics::new().unwrap()),
        );

        let outcome = retriever.retrieve("rust", 5).await.unwrap();
        assert!(outcome.degraded);
        assert_eq!(outcome.references.len(), 1);
    }

    #[tokio::test]
    async fn both_backends_failing_is_retrieval_unavailable() {
        let lexical = Arc::new(FakeLexical { hits: vec![], fail: true });
        let vector = Arc::new(FakeVector { hits: vec![], fail: true });
        let retriever = HybridRetriever::new(
            Arc::new(FixedDetector),
            Arc::new(FixedEmbedder),
            lexical,
            vector,
            fusion(),
            Arc::new(Metrics::new().unwrap()),
        );

        let err = retriever.retrieve("rust", 5).await.unwrap_err();
        assert_eq!(err.category(), "RetrievalUnavailable");
    }
}
