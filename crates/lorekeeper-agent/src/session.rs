//! The agentic search session (C10): `searchStream(caller, query, size,
//! sessionId?, events)`.
//!
//! ```text
//!  IDLE → DETECTING → RETRIEVING → GROUNDING → GENERATING → PERSISTING → DONE
//!              │           │           │             │
//!              └───────────┴───────────┴─── error ───┴──► FAILED
//! ```
//!
//! Implemented as a linear async function rather than an explicit state
//! enum: every state only ever advances forward or jumps to the single
//! FAILED exit, so the control flow already is the state machine.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use lorekeeper_core::error::{Error, Result};
use lorekeeper_core::events::Event;
use lorekeeper_core::model::{Caller, Reference};
use lorekeeper_core::traits::{GenerationSink, Generator};
use lorekeeper_core::traits::SessionStore;
use lorekeeper_observability::Metrics;
use lorekeeper_retrieval::HybridRetriever;
use lorekeeper_streaming::EventSender;

use crate::grounding::build_prompt;

pub struct AgentSession {
    retriever: Arc<HybridRetriever>,
    generator: Arc<dyn Generator>,
    sessions: Arc<dyn SessionStore>,
    metrics: Arc<Metrics>,
}

impl AgentSession {
    #[must_use]
    pub fn new(
        retriever: Arc<HybridRetriever>,
        generator: Arc<dyn Generator>,
        sessions: Arc<dyn SessionStore>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            retriever,
            generator,
            sessions,
            metrics,
        }
    }

    pub async fn search_stream(
        &self,
        caller: &Caller,
        query: &str,
        size: usize,
        session_id: Option<String>,
        events: &EventSender,
    ) -> Result<()> {
        match self.run(caller, query, size, session_id, events).await {
            Ok(resolved_session_id) => {
                events.send(Event::done(resolved_session_id)).await?;
                Ok(())
            }
            Err(e) => {
                self.metrics.search_turns_failed_total.inc();
                events.send(Event::error(e.category())).await.ok();
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        caller: &Caller,
        query: &str,
        size: usize,
        session_id: Option<String>,
        events: &EventSender,
    ) -> Result<Option<String>> {
        if query.trim().is_empty() {
            return Err(Error::validation("query must be non-empty"));
        }

        // IDLE -> DETECTING
        events.send(Event::status("detecting language")).await?;

        // DETECTING -> RETRIEVING
        events.send(Event::status("searching")).await?;
        let outcome = self.retriever.retrieve(query, size).await?;
        events
            .send(Event::Sources(outcome.references.clone()))
            .await?;

        // RETRIEVING -> GROUNDING
        let prompt = build_prompt(query, &outcome.references);

        // GROUNDING -> GENERATING
        events.send(Event::status("generating")).await?;
        let sink = ForwardingSink::new(events.clone());
        let answer = match self.generator.generate_stream(&prompt, &mut sink.clone_handle()).await {
            Ok(text) => text,
            Err(Error::Cancelled) => {
                if let Some(send_err) = sink.take_send_error() {
                    return Err(send_err);
                }
                return Err(Error::Cancelled);
            }
            Err(e) => return Err(e),
        };

        // GENERATING -> PERSISTING
        let resolved_id = self
            .persist_turn(caller, query, &answer, &outcome.references, session_id)
            .await?;

        // PERSISTING -> DONE
        Ok(resolved_id)
    }

    async fn persist_turn(
        &self,
        caller: &Caller,
        query: &str,
        answer: &str,
        references: &[Reference],
        session_id: Option<String>,
    ) -> Result<Option<String>> {
        let Some(owner) = caller.id() else {
            // Anonymous sessions are not persisted (§9 open-question resolution).
            return Ok(None);
        };

        let id = match session_id.filter(|s| !s.is_empty()) {
            Some(id) => id,
            None => {
                let title: String = query.chars().take(80).collect();
                self.sessions.create(owner, &title).await?
            }
        };

        self.sessions
            .append_turn(&id, query, answer, references.to_vec())
            .await?;

        Ok(Some(id))
    }
}

/// Forwards generator chunks onto the event bus as `answer` frames
/// (replace-with-full-text, per the §4.10 decision), remembering a send
/// failure so it can be distinguished from a caller-initiated cancellation.
#[derive(Clone)]
struct ForwardingSink {
    events: EventSender,
    send_error: Arc<Mutex<Option<Error>>>,
}

impl ForwardingSink {
    fn new(events: EventSender) -> Self {
        Self {
            events,
            send_error: Arc::new(Mutex::new(None)),
        }
    }

    fn clone_handle(&self) -> Self {
        self.clone()
    }

    fn take_send_error(&self) -> Option<Error> {
        self.send_error.lock().unwrap().take()
    }
}

#[async_trait]
impl GenerationSink for ForwardingSink {
    async fn on_chunk(&mut self, text_to_date: &str) -> bool {
        match self.events.send(Event::Answer(text_to_date.to_string())).await {
            Ok(()) => true,
            Err(e) => {
                *self.send_error.lock().unwrap() = Some(e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lorekeeper_core::config::FusionConfig;
    use lorekeeper_core::model::{Article, ChatSession, ChatSessionSummary, Hit, EMBEDDING_DIM};
    use lorekeeper_core::traits::{Embeddings, LanguageDetector, LexicalIndex, VectorIndex};

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
            title: "title".to_string(),
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

    struct FakeLexical;
    #[async_trait]
    impl LexicalIndex for FakeLexical {
        async fn put(&self, _article: &Article) -> Result<()> {
            Ok(())
        }
        async fn delete(&self, _id: &str) -> Result<()> {
            Ok(())
        }
        async fn get_by_id(&self, id: &str) -> Result<Option<Article>> {
            Ok(Some(article(id)))
        }
        async fn search(&self, _query: &str, _lang: Option<&str>, _size: usize) -> Result<Vec<Hit>> {
            Ok(vec![Hit { article: article("a"), score: 1.0 }])
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

    struct FakeVector;
    #[async_trait]
    impl VectorIndex for FakeVector {
        async fn upsert(&self, _id: &str, _vector: &[f32], _lang: &str) -> Result<()> {
            Ok(())
        }
        async fn search(&self, _query: &[f32], _size: usize, _lang: Option<&str>) -> Result<Vec<(String, f32)>> {
            Ok(vec![("a".to_string(), 1.0)])
        }
        async fn delete(&self, _id: &str) -> Result<()> {
            Ok(())
        }
    }

    struct FixedGenerator;
    #[async_trait]
    impl Generator for FixedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok("final answer [1]".to_string())
        }
        async fn generate_stream(&self, _prompt: &str, sink: &mut dyn GenerationSink) -> Result<String> {
            for chunk in ["final", "final answer", "final answer [1]"] {
                if !sink.on_chunk(chunk).await {
                    return Err(Error::Cancelled);
                }
            }
            Ok("final answer [1]".to_string())
        }
    }

    struct FakeSessions {
        created: Mutex<Vec<(String, String)>>,
        appended: Mutex<Vec<String>>,
    }
    #[async_trait]
    impl SessionStore for FakeSessions {
        async fn create(&self, owner: &str, title: &str) -> Result<String> {
            self.created.lock().unwrap().push((owner.to_string(), title.to_string()));
            Ok("session-1".to_string())
        }
        async fn append_turn(&self, id: &str, _user_msg: &str, _assistant_msg: &str, _sources: Vec<Reference>) -> Result<()> {
            self.appended.lock().unwrap().push(id.to_string());
            Ok(())
        }
        async fn get(&self, _id: &str) -> Result<ChatSession> {
            unimplemented!()
        }
        async fn list_by_owner(&self, _owner: &str, _page: usize, _size: usize) -> Result<Vec<ChatSessionSummary>> {
            Ok(vec![])
        }
        async fn delete(&self, _id: &str, _owner: &str) -> Result<()> {
            Ok(())
        }
    }

    fn fusion() -> FusionConfig {
        FusionConfig {
            alpha_lexical: 0.5,
            beta_vector: 0.5,
        }
    }

    fn build_session(sessions: Arc<FakeSessions>) -> AgentSession {
        let metrics = Arc::new(Metrics::new().unwrap());
        let retriever = Arc::new(HybridRetriever::new(
            Arc::new(FixedDetector),
            Arc::new(FixedEmbedder),
            Arc::new(FakeLexical),
            Arc::new(FakeVector),
            fusion(),
            metrics.clone(),
        ));
        AgentSession::new(retriever, Arc::new(FixedGenerator), sessions, metrics)
    }

    #[tokio::test]
    async fn authenticated_turn_creates_a_session_and_persists() {
        let sessions = Arc::new(FakeSessions {
            created: Mutex::new(vec![]),
            appended: Mutex::new(vec![]),
        });
        let session = build_session(sessions.clone());
        let (tx, mut rx) = lorekeeper_streaming::channel();
        let caller = Caller::user("alice");

        let handle = tokio::spawn(async move {
            session.search_stream(&caller, "what is rust?", 5, None, &tx).await
        });

        let mut saw_sources = false;
        let mut saw_answer = false;
        let mut terminal = None;
        while let Some(e) = rx.recv().await {
            match &e {
                Event::Sources(_) => saw_sources = true,
                Event::Answer(_) => saw_answer = true,
                Event::Done(_) | Event::Error(_) => terminal = Some(e.clone()),
                _ => {}
            }
        }

        handle.await.unwrap().unwrap();
        assert!(saw_sources);
        assert!(saw_answer);
        assert!(matches!(terminal, Some(Event::Done(_))));
        assert_eq!(sessions.created.lock().unwrap().len(), 1);
        assert_eq!(sessions.appended.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_query_is_validation_failed_before_retrieval() {
        let sessions = Arc::new(FakeSessions {
            created: Mutex::new(vec![]),
            appended: Mutex::new(vec![]),
        });
        let session = build_session(sessions);
        let (tx, mut rx) = lorekeeper_streaming::channel();
        let caller = Caller::user("alice");

        let handle = tokio::spawn(async move {
            session.search_stream(&caller, "   ", 5, None, &tx).await
        });

        let mut saw_sources = false;
        while let Some(e) = rx.recv().await {
            if matches!(e, Event::Sources(_)) {
                saw_sources = true;
            }
        }
        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.category(), "ValidationFailed");
        assert!(!saw_sources);
    }

    #[tokio::test]
    async fn anonymous_turn_is_not_persisted() {
        let sessions = Arc::new(FakeSessions {
            created: Mutex::new(vec![]),
            appended: Mutex::new(vec![]),
        });
        let session = build_session(sessions.clone());
        let (tx, mut rx) = lorekeeper_streaming::channel();
        let caller = Caller::anonymous();

        let handle = tokio::spawn(async move {
            session.search_stream(&caller, "what is rust?", 5, None, &tx).await
        });
        while rx.recv().await.is_some() {}
        handle.await.unwrap().unwrap();

        assert!(sessions.created.lock().unwrap().is_empty());
        assert!(sessions.appended.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn event_ordering_is_status_then_sources_then_answer_then_done() {
        let sessions = Arc::new(FakeSessions {
            created: Mutex::new(vec![]),
            appended: Mutex::new(vec![]),
        });
        let session = build_session(sessions);
        let (tx, mut rx) = lorekeeper_streaming::channel();
        let caller = Caller::user("alice");

        let handle = tokio::spawn(async move {
            session.search_stream(&caller, "q", 5, None, &tx).await
        });

        let mut saw_sources_index = None;
        let mut first_answer_index = None;
        let mut done_index = None;
        let mut i = 0;
        while let Some(e) = rx.recv().await {
            match e {
                Event::Sources(_) => saw_sources_index = Some(i),
                Event::Answer(_) if first_answer_index.is_none() => first_answer_index = Some(i),
                Event::Done(_) => done_index = Some(i),
                _ => {}
            }
            i += 1;
        }
        handle.await.unwrap().unwrap();

        assert!(saw_sources_index.unwrap() < first_answer_index.unwrap());
        assert!(first_answer_index.unwrap() < done_index.unwrap());
    }
}
