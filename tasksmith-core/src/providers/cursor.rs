//! Cursor provider implementation
//!
//! Cursor's API takes a top-level `system` prompt with a single user
//! message and authenticates with a bearer token. The same invoker backs the
//! `cursor-claude` tag, which pins a Claude model on the Cursor endpoint.

use crate::config::{ProviderConfig, SecretString};
use crate::http::{HttpClient, InvokeError};
use crate::providers::adapter::{
    resolve_model, EnvelopeKind, Prompt, RawProviderResponse, TaskProvider,
};
use async_trait::async_trait;
use serde_json::json;
use tracing::{info, Instrument};

/// Default Cursor endpoint
pub const CURSOR_ENDPOINT: &str = "https://api.cursor.sh/v1/chat/completions";

/// Model pinned by the `cursor-claude` tag when `CURSOR_MODEL` is unset
pub const CURSOR_CLAUDE_MODEL: &str = "claude-3-5-sonnet";

/// Cursor invoker
pub struct CursorProvider {
    tag: String,
    http: HttpClient,
    api_key: SecretString,
    endpoint: String,
    model: Option<String>,
}

impl CursorProvider {
    /// Create the plain `cursor` provider
    pub fn new(http: HttpClient, api_key: SecretString) -> Self {
        Self {
            tag: "cursor".to_string(),
            http,
            api_key,
            endpoint: CURSOR_ENDPOINT.to_string(),
            model: None,
        }
    }

    /// Create the `cursor-claude` provider, which always sends a Claude model
    pub fn claude(http: HttpClient, api_key: SecretString, model: Option<String>) -> Self {
        Self {
            tag: "cursor-claude".to_string(),
            model: Some(model.unwrap_or_else(|| CURSOR_CLAUDE_MODEL.to_string())),
            ..Self::new(http, api_key)
        }
    }

    /// Override the endpoint URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl TaskProvider for CursorProvider {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn envelope(&self) -> EnvelopeKind {
        EnvelopeKind::Cursor
    }

    fn describe(&self) -> String {
        match &self.model {
            Some(model) => format!("{} via Cursor API at {} (model {})", self.tag, self.endpoint, model),
            None => format!("{} via Cursor API at {}", self.tag, self.endpoint),
        }
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
        let headers = [(
            "Authorization",
            format!("Bearer {}", self.api_key.expose_secret()),
        )];

        let span = tracing::info_span!("provider_call", provider = %self.tag, model = %model);
        async {
            info!("Sending request to Cursor");
            self.http.post_json(&self.endpoint, &headers, &body).await
        }
        .instrument(span)
        .await
    }
}
