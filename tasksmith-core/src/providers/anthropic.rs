//! Anthropic provider implementation
//!
//! Calls the Claude messages API. The system prompt travels in the
//! top-level `system` field; the answer comes back as `content[0].text`.

use crate::config::{ProviderConfig, SecretString};
use crate::http::{HttpClient, InvokeError};
use crate::providers::adapter::{
    resolve_model, EnvelopeKind, Prompt, RawProviderResponse, TaskProvider,
};
use async_trait::async_trait;
use serde_json::json;
use tracing::{info, Instrument};

/// Default messages endpoint
pub const ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";

/// API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Claude invoker
pub struct AnthropicProvider {
    http: HttpClient,
    api_key: SecretString,
    endpoint: String,
    model: Option<String>,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider against the default endpoint
    pub fn new(http: HttpClient, api_key: SecretString) -> Self {
        Self {
            http,
            api_key,
            endpoint: ANTHROPIC_ENDPOINT.to_string(),
            model: None,
        }
    }

    /// Override the endpoint URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Pin a model instead of using the configured one
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }
}

#[async_trait]
impl TaskProvider for AnthropicProvider {
    fn tag(&self) -> &str {
        "claude"
    }

    fn envelope(&self) -> EnvelopeKind {
        EnvelopeKind::Anthropic
    }

    fn describe(&self) -> String {
        format!("claude via Anthropic messages API at {}", self.endpoint)
    }

    async fn invoke(
        &self,
        config: &ProviderConfig,
        prompt: &Prompt,
    ) -> Result<RawProviderResponse, InvokeError> {
        let model = resolve_model(self.model.as_deref(), config);
        let body = json!({
            "model": model,
            "system": prompt.system,
            "messages": [{"role": "user", "content": prompt.user}],
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
        });
        let headers = [
            ("x-api-key", self.api_key.expose_secret().to_string()),
            ("anthropic-version", ANTHROPIC_VERSION.to_string()),
        ];

        let span = tracing::info_span!("provider_call", provider = "claude", model = %model);
        async {
            info!("Sending request to Claude");
            self.http.post_json(&self.endpoint, &headers, &body).await
        }
        .instrument(span)
        .await
    }
}
