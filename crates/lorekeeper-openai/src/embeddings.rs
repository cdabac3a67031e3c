//! C2: embeddings backed by the `OpenAI` embeddings API.

use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateEmbeddingRequest, EmbeddingInput};
use async_openai::Client;
use async_trait::async_trait;

use lorekeeper_core::config::env_vars::{env_string, OPENAI_API_KEY};
use lorekeeper_core::config::OpenAiConfig;
use lorekeeper_core::error::{Error, Result};
use lorekeeper_core::model::EMBEDDING_DIM;
use lorekeeper_core::retry::{with_retry, RetryPolicy};
use lorekeeper_core::traits::Embeddings;

/// `OpenAI`-backed embedder, producing [`EMBEDDING_DIM`]-dimension vectors.
///
/// `text-embedding-3-small`/`-large` both accept a `dimensions` parameter
/// that truncates the native embedding to a smaller size while preserving
/// most of its semantic content; we pin it to 768 so every embedding this
/// system produces is directly comparable regardless of which model a
/// deployment chooses.
pub struct OpenAiEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    retry_policy: RetryPolicy,
}

impl OpenAiEmbedder {
    /// Build from the shared application config, resolving the API key
    /// through its [`lorekeeper_core::config::SecretReference`].
    pub fn from_config(config: &OpenAiConfig) -> Result<Self> {
        let api_key = config.api_key.resolve()?;
        let openai_config = OpenAIConfig::new().with_api_key(api_key);
        Ok(OpenAiEmbedder {
            client: Client::with_config(openai_config),
            model: config.embedding_model.clone(),
            retry_policy: RetryPolicy::exponential(2),
        })
    }

    /// Build directly from the `OPENAI_API_KEY` environment variable, for
    /// callers that do not otherwise need a full [`OpenAiConfig`].
    pub fn try_new(model: impl Into<String>) -> Result<Self> {
        let api_key = env_string(OPENAI_API_KEY).ok_or_else(|| {
            Error::internal(format!("{OPENAI_API_KEY} environment variable must be set"))
        })?;
        let openai_config = OpenAIConfig::new().with_api_key(api_key);
        Ok(OpenAiEmbedder {
            client: Client::with_config(openai_config),
            model: model.into(),
            retry_policy: RetryPolicy::exponential(2),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = CreateEmbeddingRequest {
            model: self.model.clone(),
            input: EmbeddingInput::StringArray(texts.to_vec()),
            encoding_format: None,
            dimensions: Some(EMBEDDING_DIM as u32),
            user: None,
        };

        let response = with_retry(&self.retry_policy, || async {
            self.client
                .embeddings()
                .create(request.clone())
                .await
                .map_err(|e| Error::upstream(format!("OpenAI embeddings error: {e}")))
        })
        .await?;

        if response.data.len() != texts.len() {
            return Err(Error::malformed(
                "OpenAI embeddings response size did not match request size",
            ));
        }

        let mut by_index: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        for d in response.data {
            let idx = d.index as usize;
            if idx >= by_index.len() {
                return Err(Error::malformed(
                    "OpenAI embeddings response index out of range",
                ));
            }
            if d.embedding.len() != EMBEDDING_DIM {
                return Err(Error::malformed(format!(
                    "expected a {EMBEDDING_DIM}-dimension embedding, got {}",
                    d.embedding.len()
                )));
            }
            by_index[idx] = Some(d.embedding);
        }

        by_index
            .into_iter()
            .map(|v| {
                v.ok_or_else(|| Error::malformed("OpenAI embeddings response missing an entry"))
            })
            .collect()
    }
}

#[async_trait]
impl Embeddings for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = self.embed_batch(&[text.to_string()]).await?;
        v.pop()
            .ok_or_else(|| Error::malformed("no embedding returned from OpenAI"))
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed_batch(texts).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn from_config_fails_fast_when_api_key_unresolvable() {
        let config = OpenAiConfig {
            embedding_model: "text-embedding-3-small".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            api_key: lorekeeper_core::config::SecretReference::from_env(
                "LOREKEEPER_TEST_UNSET_VAR_FOR_EMBEDDER",
            ),
        };
        let err = OpenAiEmbedder::from_config(&config).unwrap_err();
        assert_eq!(err.category(), "Internal");
    }
}
