//! C3: text generation backed by the `OpenAI` chat completions API.

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use futures::StreamExt;

use lorekeeper_core::config::OpenAiConfig;
use lorekeeper_core::error::{Error, Result};
use lorekeeper_core::retry::RetryPolicy;
use lorekeeper_core::traits::{wrap_prompt, GenerationSink, Generator};

/// `OpenAI`-backed generator. Every prompt passed to [`Generator::generate`]
/// or [`Generator::generate_stream`] is wrapped with the strict
/// "respond only with the requested content" directive (§4.3) before it
/// reaches the model — this is a property of the Generator contract, not
/// of any particular caller, so it lives here rather than in C10.
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiGenerator {
    pub fn from_config(config: &OpenAiConfig) -> Result<Self> {
        let api_key = config.api_key.resolve()?;
        let openai_config = OpenAIConfig::new().with_api_key(api_key);
        Ok(OpenAiGenerator {
            client: Client::with_config(openai_config),
            model: config.chat_model.clone(),
            temperature: 0.2,
            max_tokens: 1024,
        })
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_request(
        &self,
        prompt: &str,
        stream: bool,
    ) -> Result<async_openai::types::CreateChatCompletionRequest> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(wrap_prompt(prompt))
            .build()
            .map_err(|e| Error::internal(format!("building chat request: {e}")))?;

        CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .stream(stream)
            .messages(vec![message.into()])
            .build()
            .map_err(|e| Error::internal(format!("building chat request: {e}")))
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        // Generation is not retried beyond what the client reconnects at
        // the stream level (§7) — not idempotent, and retrying risks a
        // duplicated, separately-billed completion.
        let _no_retry = RetryPolicy::none();
        let request = self.build_request(prompt, false)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| Error::upstream(format!("OpenAI chat completion error: {e}")))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::malformed("OpenAI returned no completion content"))
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        sink: &mut dyn GenerationSink,
    ) -> Result<String> {
        let request = self.build_request(prompt, true)?;

        let mut stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| Error::upstream(format!("OpenAI chat stream error: {e}")))?;

        let mut accumulated = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::upstream(format!("OpenAI stream error: {e}")))?;
            let Some(choice) = chunk.choices.into_iter().next() else {
                continue;
            };
            if let Some(delta) = choice.delta.content {
                accumulated.push_str(&delta);
                if !sink.on_chunk(&accumulated).await {
                    return Err(Error::Cancelled);
                }
            }
        }

        Ok(accumulated)
    }
}
