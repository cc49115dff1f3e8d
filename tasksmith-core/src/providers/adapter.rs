//! Provider invoker trait
//!
//! Every AI provider is reached through a [`TaskProvider`]: it turns a
//! [`Prompt`] plus the active [`ProviderConfig`] into one HTTP call and
//! returns the raw response envelope.

use crate::config::ProviderConfig;
use crate::http::InvokeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Raw response body returned by a provider
pub type RawProviderResponse = Value;

/// System and user halves of a provider prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Instructions, sent in the provider's system slot
    pub system: String,
    /// Source material, sent as the user message
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Shape of the envelope a provider wraps its answer in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeKind {
    /// `{"content": [{"type": "text", "text": ...}]}`
    Anthropic,
    /// `{"content": ...}` or `{"message": {"content": ...}}`
    Cursor,
    /// `{"choices": [{"message": {"content": ...}}]}`
    ChatCompletions,
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Anthropic => "anthropic",
            Self::Cursor => "cursor",
            Self::ChatCompletions => "chat-completions",
        })
    }
}

/// Core provider trait that all AI providers implement
#[async_trait]
pub trait TaskProvider: Send + Sync {
    /// Registry tag of this provider (e.g. `claude`)
    fn tag(&self) -> &str;

    /// Envelope shape of this provider's responses
    fn envelope(&self) -> EnvelopeKind;

    /// One-line human description
    fn describe(&self) -> String;

    /// Send the prompt and return the raw response body
    async fn invoke(
        &self,
        config: &ProviderConfig,
        prompt: &Prompt,
    ) -> Result<RawProviderResponse, InvokeError>;
}

/// Pick the model for a request: a provider-pinned model wins over the config
pub(crate) fn resolve_model<'a>(pinned: Option<&'a str>, config: &'a ProviderConfig) -> &'a str {
    pinned.unwrap_or(&config.model_name)
}
