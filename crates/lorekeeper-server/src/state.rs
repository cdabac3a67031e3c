//! Shared application state, constructed once at startup and cloned (as an
//! `Arc`-backed handle) into every request.

use std::sync::Arc;

use lorekeeper_agent::AgentSession;
use lorekeeper_core::config::AppConfig;
use lorekeeper_core::error::{Error, Result};
use lorekeeper_core::traits::{DocumentParser, LexicalIndex, VectorIndex};
use lorekeeper_documents::ExtensionDocumentParser;
use lorekeeper_ingest::IngestionPipeline;
use lorekeeper_lang::WhatlangDetector;
use lorekeeper_lexical::SqliteLexicalIndex;
use lorekeeper_observability::Metrics;
use lorekeeper_openai::{OpenAiEmbedder, OpenAiGenerator};
use lorekeeper_retrieval::HybridRetriever;
use lorekeeper_sessions::{AuthStore, SqliteSessionStore};
use lorekeeper_vector::{HnswVectorIndex, VectorIndexConfig};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub lexical: Arc<SqliteLexicalIndex>,
    pub vector: Arc<dyn VectorIndex>,
    pub auth: Arc<AuthStore>,
    pub sessions: Arc<SqliteSessionStore>,
    pub documents: Arc<ExtensionDocumentParser>,
    pub ingestion: Arc<IngestionPipeline>,
    pub agent: Arc<AgentSession>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn build(config: AppConfig) -> Result<Self> {
        let detector: Arc<dyn lorekeeper_core::traits::LanguageDetector> =
            Arc::new(WhatlangDetector);

        let embedder: Arc<dyn lorekeeper_core::traits::Embeddings> =
            Arc::new(OpenAiEmbedder::from_config(&config.openai)?);
        let generator: Arc<dyn lorekeeper_core::traits::Generator> =
            Arc::new(OpenAiGenerator::from_config(&config.openai)?);

        let lexical = Arc::new(SqliteLexicalIndex::open(&config.database_path)?);
        let lexical_trait: Arc<dyn LexicalIndex> = lexical.clone();

        let vector_config = VectorIndexConfig {
            dimension: lorekeeper_core::model::EMBEDDING_DIM,
            max_elements: config.vector.max_elements,
            m: config.vector.m,
            ef_construction: config.vector.ef_construction,
        };
        let vector: Arc<dyn lorekeeper_core::traits::VectorIndex> =
            Arc::new(HnswVectorIndex::new(vector_config));

        let session_pool = lorekeeper_sessions::open_pool(&config.database_path)?;
        let sessions = Arc::new(SqliteSessionStore::new(session_pool.clone()));
        let sessions_trait: Arc<dyn lorekeeper_core::traits::SessionStore> = sessions.clone();
        let auth = Arc::new(AuthStore::new(session_pool, config.auth.token_ttl_seconds));

        let documents = Arc::new(ExtensionDocumentParser::default());
        let _: &dyn DocumentParser = documents.as_ref();

        let metrics = Arc::new(Metrics::new().map_err(|e| Error::internal(e.to_string()))?);

        let ingestion = Arc::new(IngestionPipeline::new(
            detector.clone(),
            embedder.clone(),
            generator.clone(),
            lexical_trait.clone(),
            vector.clone(),
            config.ingestion_concurrency,
            metrics.clone(),
        ));

        let retriever = Arc::new(HybridRetriever::new(
            detector,
            embedder,
            lexical_trait,
            vector.clone(),
            config.fusion,
            metrics.clone(),
        ));
        let agent = Arc::new(AgentSession::new(retriever, generator, sessions_trait, metrics.clone()));

        Ok(Self {
            config: Arc::new(config),
            lexical,
            vector,
            auth,
            sessions,
            documents,
            ingestion,
            agent,
            metrics,
        })
    }
}
