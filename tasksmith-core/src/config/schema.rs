//! Configuration schema structures with serde support

use super::error::ValidationError;
use super::secrets::SecretString;
use crate::providers::retry::RetryPolicy;
use serde::{Deserialize, Serialize};

/// Provider used when nothing else is configured
pub const DEFAULT_PROVIDER: &str = "claude";

/// Model used when nothing else is configured
pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-20250219";

/// Root configuration structure for Tasksmith
///
/// `Settings::default()` is the static fallback configuration. A config file
/// and then the process environment are layered on top of it.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Active provider selection and generation parameters
    pub provider: ProviderConfig,

    /// Credentials and endpoints per provider
    pub providers: ProviderAccessTable,

    /// Provider tag used when `provider.provider_name` is not registered
    pub fallback_provider: String,

    /// TLS certificate verification mode for outbound requests
    pub tls: TlsVerification,

    /// Global connection settings
    pub connection: ConnectionConfig,

    /// Retry policy applied by the dispatcher
    pub retry: RetryPolicy,

    /// Validate dependency ordering and task totals of generated task sets
    pub strict_validation: bool,

    /// Project name written into generated task set metadata
    pub project_name: String,

    /// Number of subtasks requested by `expand` when none is given
    pub default_subtasks: u32,

    /// Default tracing filter directive
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            providers: ProviderAccessTable::default(),
            fallback_provider: DEFAULT_PROVIDER.to_string(),
            tls: TlsVerification::default(),
            connection: ConnectionConfig::default(),
            retry: RetryPolicy::default(),
            strict_validation: false,
            project_name: "Task Master".to_string(),
            default_subtasks: 3,
            log_level: "info".to_string(),
        }
    }
}

/// Provider selection and generation parameters for one invocation
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Provider tag, matched case-insensitively against the registry
    pub provider_name: String,

    /// Model identifier sent to providers that do not pin their own model
    pub model_name: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature (0.0 to 1.0)
    pub temperature: f32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_name: DEFAULT_PROVIDER.to_string(),
            model_name: DEFAULT_MODEL.to_string(),
            max_tokens: 4000,
            temperature: 0.7,
        }
    }
}

impl ProviderConfig {
    /// Create a config for the given provider with default parameters
    pub fn for_provider(provider_name: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            ..Default::default()
        }
    }

    /// Validate generation parameters
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.provider_name.trim().is_empty() {
            return Err(ValidationError::required(format!("{}.provider_name", path)));
        }

        if self.model_name.trim().is_empty() {
            return Err(ValidationError::required(format!("{}.model_name", path)));
        }

        if self.max_tokens == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.max_tokens", path),
                "Must be greater than 0",
            ));
        }

        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ValidationError::out_of_range(
                format!("{}.temperature", path),
                "Must be between 0.0 and 1.0",
            ));
        }

        Ok(())
    }
}

/// Credentials, endpoint and model override for a single provider
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderAccess {
    /// API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<SecretString>,

    /// Full endpoint URL; the provider's built-in default is used when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Model pinned for this provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ProviderAccess {
    /// The API key, if one is set and non-blank
    pub fn api_key(&self) -> Option<&SecretString> {
        self.api_key.as_ref().filter(|key| !key.is_empty())
    }

    fn validate(&self, path: &str) -> Result<(), ValidationError> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(());
        };

        match url::Url::parse(endpoint) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(()),
            Ok(url) => Err(ValidationError::invalid_url(
                format!("{}.endpoint", path),
                format!("URL scheme must be http or https, got: {}", url.scheme()),
            )
            .with_hint("use the full chat completions URL, e.g. https://host/v1/chat/completions")),
            Err(e) => Err(ValidationError::invalid_url(
                format!("{}.endpoint", path),
                e.to_string(),
            )),
        }
    }
}

/// Access settings for every built-in provider
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderAccessTable {
    pub anthropic: ProviderAccess,
    pub cursor: ProviderAccess,
    pub openai: ProviderAccess,
    pub perplexity: ProviderAccess,
}

/// TLS certificate verification mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsVerification {
    /// Verify server certificates (default)
    #[default]
    Strict,
    /// Accept any certificate; development use only
    Disabled,
}

/// Connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,

    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            request_timeout_ms: 300_000,
        }
    }
}

impl Settings {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.provider.validate("provider")?;

        if self.fallback_provider.trim().is_empty() {
            return Err(ValidationError::required("fallback_provider")
                .with_hint("set FALLBACK_PROVIDER, e.g. to claude"));
        }

        self.providers.anthropic.validate("providers.anthropic")?;
        self.providers.cursor.validate("providers.cursor")?;
        self.providers.openai.validate("providers.openai")?;
        self.providers.perplexity.validate("providers.perplexity")?;

        if self.connection.connect_timeout_ms == 0 {
            return Err(ValidationError::out_of_range(
                "connection.connect_timeout_ms",
                "Must be greater than 0",
            ));
        }

        if self.connection.request_timeout_ms < self.connection.connect_timeout_ms {
            return Err(ValidationError::conflict(
                "connection.request_timeout_ms",
                "Must be >= connect_timeout_ms",
            ));
        }

        self.retry.validate("retry")?;

        if self.default_subtasks == 0 {
            return Err(ValidationError::out_of_range(
                "default_subtasks",
                "Must be greater than 0",
            ));
        }

        Ok(())
    }
}
