//! Provider registry
//!
//! Maps provider tags to [`TaskProvider`] handles. Handles are built from a
//! registered factory the first time a tag is used and cached for the
//! lifetime of the registry.

use crate::config::{ProviderAccess, SecretString, Settings};
use crate::http::{HttpClient, HttpOptions};
use crate::providers::adapter::TaskProvider;
use crate::providers::anthropic::AnthropicProvider;
use crate::providers::cursor::CursorProvider;
use crate::providers::error::GenerateError;
use crate::providers::openai::OpenAIProvider;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

type ProviderFactory = Box<dyn Fn() -> Result<Arc<dyn TaskProvider>, GenerateError> + Send + Sync>;

/// Tag-to-provider table with lazily built handles
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
    handles: Mutex<HashMap<String, Arc<dyn TaskProvider>>>,
    fallback: Option<String>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    /// Create an empty registry with no fallback
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            handles: Mutex::new(HashMap::new()),
            fallback: None,
        }
    }

    /// Register the built-in providers using the given settings
    ///
    /// Factories capture their credentials now; a missing API key only
    /// surfaces when the tag is first used.
    pub fn from_settings(settings: &Settings) -> Result<Self, GenerateError> {
        let options = HttpOptions::from_config(&settings.connection, settings.tls);
        let http = HttpClient::with_options(options).map_err(|e| GenerateError::ProviderSetup {
            provider: "http".to_string(),
            message: e.to_string(),
        })?;

        let mut registry = Self::new().with_fallback(settings.fallback_provider.clone());

        let access = settings.providers.anthropic.clone();
        let client = http.clone();
        registry.register("claude", move || {
            let key = require_key("claude", &access, "ANTHROPIC_API_KEY")?;
            let mut provider =
                AnthropicProvider::new(client.clone(), key).with_model(access.model.clone());
            if let Some(endpoint) = &access.endpoint {
                provider = provider.with_endpoint(endpoint.clone());
            }
            Ok(Arc::new(provider) as Arc<dyn TaskProvider>)
        });

        let access = settings.providers.cursor.clone();
        let client = http.clone();
        registry.register("cursor", move || {
            let key = require_key("cursor", &access, "CURSOR_API_KEY")?;
            let mut provider = CursorProvider::new(client.clone(), key);
            if let Some(endpoint) = &access.endpoint {
                provider = provider.with_endpoint(endpoint.clone());
            }
            Ok(Arc::new(provider) as Arc<dyn TaskProvider>)
        });

        let access = settings.providers.cursor.clone();
        let client = http.clone();
        registry.register("cursor-claude", move || {
            let key = require_key("cursor-claude", &access, "CURSOR_API_KEY")?;
            let mut provider = CursorProvider::claude(client.clone(), key, access.model.clone());
            if let Some(endpoint) = &access.endpoint {
                provider = provider.with_endpoint(endpoint.clone());
            }
            Ok(Arc::new(provider) as Arc<dyn TaskProvider>)
        });

        let access = settings.providers.openai.clone();
        let client = http.clone();
        registry.register("openai", move || {
            let key = require_key("openai", &access, "OPENAI_API_KEY")?;
            let mut provider = OpenAIProvider::openai(client.clone(), key, access.model.clone());
            if let Some(endpoint) = &access.endpoint {
                provider = provider.with_endpoint(endpoint.clone());
            }
            Ok(Arc::new(provider) as Arc<dyn TaskProvider>)
        });

        let access = settings.providers.perplexity.clone();
        registry.register("perplexity", move || {
            let key = require_key("perplexity", &access, "PERPLEXITY_API_KEY")?;
            let mut provider = OpenAIProvider::perplexity(http.clone(), key, access.model.clone());
            if let Some(endpoint) = &access.endpoint {
                provider = provider.with_endpoint(endpoint.clone());
            }
            Ok(Arc::new(provider) as Arc<dyn TaskProvider>)
        });

        Ok(registry)
    }

    /// Set the tag used when a requested provider is not registered
    pub fn with_fallback(mut self, tag: impl Into<String>) -> Self {
        self.fallback = Some(normalize_tag(&tag.into()));
        self
    }

    /// Register a factory for a tag, replacing any previous one
    pub fn register<F>(&mut self, tag: &str, factory: F)
    where
        F: Fn() -> Result<Arc<dyn TaskProvider>, GenerateError> + Send + Sync + 'static,
    {
        let tag = normalize_tag(tag);
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&tag);
        self.factories.insert(tag, Box::new(factory));
    }

    /// Register an already built provider under its own tag
    pub fn register_instance(&mut self, provider: Arc<dyn TaskProvider>) {
        let tag = provider.tag().to_string();
        self.register(&tag, move || Ok(Arc::clone(&provider)));
    }

    /// Map a requested provider name to a registered tag
    ///
    /// Matching is case-insensitive. Unknown names resolve to the fallback
    /// tag with a warning.
    pub fn resolve(&self, requested: &str) -> Result<String, GenerateError> {
        let tag = normalize_tag(requested);
        if self.factories.contains_key(&tag) {
            return Ok(tag);
        }

        match &self.fallback {
            Some(fallback) if self.factories.contains_key(fallback) => {
                warn!(
                    requested = requested,
                    fallback = %fallback,
                    "Unknown AI provider, using fallback"
                );
                Ok(fallback.clone())
            }
            _ => Err(GenerateError::UnsupportedProvider {
                requested: requested.to_string(),
                available: self.tags(),
            }),
        }
    }

    /// Get the handle for a registered tag, building it on first use
    pub fn handle(&self, tag: &str) -> Result<Arc<dyn TaskProvider>, GenerateError> {
        let tag = normalize_tag(tag);
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(handle) = handles.get(&tag) {
            return Ok(Arc::clone(handle));
        }

        let factory = self
            .factories
            .get(&tag)
            .ok_or_else(|| GenerateError::UnsupportedProvider {
                requested: tag.clone(),
                available: self.tags(),
            })?;

        let handle = factory()?;
        debug!(provider = %tag, description = %handle.describe(), "Initialized provider");
        handles.insert(tag, Arc::clone(&handle));
        Ok(handle)
    }

    /// Registered tags, sorted
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.factories.keys().cloned().collect();
        tags.sort();
        tags
    }

    /// Whether the handle for a tag has been built
    pub fn is_initialized(&self, tag: &str) -> bool {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&normalize_tag(tag))
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().to_ascii_lowercase()
}

fn require_key(
    provider: &str,
    access: &ProviderAccess,
    variable: &str,
) -> Result<SecretString, GenerateError> {
    let key = access
        .api_key()
        .cloned()
        .ok_or_else(|| GenerateError::ProviderSetup {
            provider: provider.to_string(),
            message: format!("{} is not set", variable),
        })?;
    debug!(provider, key = %key.partial_redact(), "Using API key from {}", variable);
    Ok(key)
}
