mod client;
pub(crate) mod schema;
pub(crate) mod types;

pub use schema::StructuredOutput;

use tracing::debug;

use crate::error::{AiError, Result};
use crate::util::strip_code_blocks;
use client::{OpenAiClient, OPENAI_API_URL};
use types::{ChatRequest, WireMessage};

const DEFAULT_MAX_TOKENS: u32 = 1000;

// =============================================================================
// OpenAi Agent
// =============================================================================

/// Chat-completion agent for OpenAI and any API speaking the same protocol
/// (Perplexity, local gateways) via [`OpenAi::with_base_url`].
#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    base_url: Option<String>,
    max_tokens: u32,
    http: reqwest::Client,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Same agent pointed at a different model, sharing the HTTP pool.
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(OPENAI_API_URL)
    }

    fn client(&self) -> OpenAiClient {
        let client = OpenAiClient::new(&self.api_key, self.http.clone());
        match self.base_url {
            Some(ref url) => client.with_base_url(url),
            None => client,
        }
    }

    fn request(&self) -> ChatRequest {
        ChatRequest::new(&self.model)
            .token_limit(self.max_tokens)
    }

    /// Plain chat completion; returns the trimmed text of the first choice.
    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<String> {
        let request = self
            .request()
            .message(WireMessage::system(system))
            .message(WireMessage::user(user));

        self.client()
            .chat(&request)
            .await?
            .into_text()
            .map(|text| text.trim().to_string())
            .ok_or_else(|| AiError::EmptyResponse(self.model.clone()))
    }

    /// Structured output extraction: the model must answer with JSON matching
    /// `T`'s schema. A response that does not deserialize is `AiError::Parse`.
    pub async fn extract<T: StructuredOutput>(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<T> {
        debug!(type_name = T::type_name(), model = %self.model, "Structured output extraction");

        let request = self
            .request()
            .message(WireMessage::system(system))
            .message(WireMessage::user(user))
            .json_schema("structured_response", T::strict_schema());

        let text = self
            .client()
            .chat(&request)
            .await?
            .into_text()
            .ok_or_else(|| AiError::EmptyResponse(self.model.clone()))?;

        serde_json::from_str(strip_code_blocks(&text)).map_err(|e| {
            AiError::Parse(format!("{} did not match {}: {e}", self.model, T::type_name()))
        })
    }

    /// Vision request: describe the image at `image_url` following `instruction`.
    pub async fn describe_image(
        &self,
        system: impl Into<String>,
        instruction: impl Into<String>,
        image_url: impl Into<String>,
    ) -> Result<String> {
        let request = self
            .request()
            .message(WireMessage::system(system))
            .message(WireMessage::user_with_image(instruction, image_url));

        self.client()
            .chat(&request)
            .await?
            .into_text()
            .map(|text| text.trim().to_string())
            .ok_or_else(|| AiError::EmptyResponse(self.model.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_new() {
        let ai = OpenAi::new("sk-test", "gpt-4o");
        assert_eq!(ai.model(), "gpt-4o");
        assert_eq!(ai.api_key, "sk-test");
        assert_eq!(ai.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(ai.base_url(), OPENAI_API_URL);
    }

    #[test]
    fn perplexity_is_just_a_base_url() {
        let ai = OpenAi::new("pplx-test", "sonar-pro").with_base_url("https://api.perplexity.ai");
        assert_eq!(ai.base_url(), "https://api.perplexity.ai");
    }

    #[test]
    fn with_model_keeps_settings() {
        let ai = OpenAi::new("sk-test", "gpt-4o")
            .with_max_tokens(300)
            .with_base_url("http://localhost:8080/v1");
        let vision = ai.with_model("gpt-4o-mini");

        assert_eq!(vision.model(), "gpt-4o-mini");
        assert_eq!(vision.max_tokens, 300);
        assert_eq!(vision.base_url(), "http://localhost:8080/v1");
        assert_eq!(ai.model(), "gpt-4o");
    }
}
