//! OpenAI-compatible provider implementation
//!
//! Serves the `openai` and `perplexity` tags. The system prompt is sent as
//! the first chat message and the answer is read from
//! `choices[0].message.content`.

use crate::config::{ProviderConfig, SecretString};
use crate::http::{HttpClient, InvokeError};
use crate::providers::adapter::{EnvelopeKind, Prompt, RawProviderResponse, TaskProvider};
use async_trait::async_trait;
use serde_json::json;
use tracing::{info, Instrument};

/// Default OpenAI chat completions endpoint
pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default Perplexity chat completions endpoint
pub const PERPLEXITY_ENDPOINT: &str = "https://api.perplexity.ai/chat/completions";

/// Chat completions invoker
pub struct OpenAIProvider {
    tag: &'static str,
    http: HttpClient,
    api_key: SecretString,
    endpoint: String,
    model: String,
}

impl OpenAIProvider {
    /// Create the `openai` provider
    pub fn openai(http: HttpClient, api_key: SecretString, model: Option<String>) -> Self {
        Self {
            tag: "openai",
            http,
            api_key,
            endpoint: OPENAI_ENDPOINT.to_string(),
            model: model.unwrap_or_else(|| "gpt-4o".to_string()),
        }
    }

    /// Create the `perplexity` provider
    pub fn perplexity(http: HttpClient, api_key: SecretString, model: Option<String>) -> Self {
        Self {
            tag: "perplexity",
            http,
            api_key,
            endpoint: PERPLEXITY_ENDPOINT.to_string(),
            model: model.unwrap_or_else(|| "sonar-pro".to_string()),
        }
    }

    /// Override the endpoint URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl TaskProvider for OpenAIProvider {
    fn tag(&self) -> &str {
        self.tag
    }

    fn envelope(&self) -> EnvelopeKind {
        EnvelopeKind::ChatCompletions
    }

    fn describe(&self) -> String {
        format!(
            "{} via chat completions at {} (model {})",
            self.tag, self.endpoint, self.model
        )
    }

    async fn invoke(
        &self,
        config: &ProviderConfig,
        prompt: &Prompt,
    ) -> Result<RawProviderResponse, InvokeError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user},
            ],
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
        });
        let headers = [(
            "Authorization",
            format!("Bearer {}", self.api_key.expose_secret()),
        )];

        let span = tracing::info_span!("provider_call", provider = self.tag, model = %self.model);
        async {
            info!("Sending chat completion request");
            self.http.post_json(&self.endpoint, &headers, &body).await
        }
        .instrument(span)
        .await
    }
}
