//! Fault classification and dispatcher error types

use crate::http::InvokeError;
use crate::tasks::TaskSetError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable category of a provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Credentials rejected (401)
    Auth,
    /// Request rejected as malformed (400)
    BadRequest,
    /// Too many requests (429)
    RateLimit,
    /// Provider-side failure (5xx)
    ServerError,
    /// No response received
    Network,
    /// Response could not be turned into the expected JSON
    ParseFailure,
    /// Provider not available
    Unsupported,
    /// Anything else
    Generic,
}

impl FaultKind {
    /// User-facing explanation for this kind of fault
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Auth => "Authentication failed. Please check your API key.",
            Self::BadRequest => "The AI provider rejected the request as invalid.",
            Self::RateLimit => "Rate limit exceeded. Please wait a moment and try again.",
            Self::ServerError => {
                "The AI provider is experiencing server issues. Please try again later."
            }
            Self::Network => {
                "Could not reach the AI provider. Please check your network connection."
            }
            Self::ParseFailure => "The AI provider returned a response that could not be parsed.",
            Self::Unsupported => "The configured AI provider is not supported.",
            Self::Generic => "The request to the AI provider failed.",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auth => "auth",
            Self::BadRequest => "bad_request",
            Self::RateLimit => "rate_limit",
            Self::ServerError => "server_error",
            Self::Network => "network",
            Self::ParseFailure => "parse_failure",
            Self::Unsupported => "unsupported",
            Self::Generic => "generic",
        };
        f.write_str(name)
    }
}

/// A classified provider failure
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{} ({raw_message})", .kind.user_message())]
pub struct ProviderFault {
    pub kind: FaultKind,
    /// Underlying error text
    pub raw_message: String,
    /// HTTP status, when a response was received
    pub status: Option<u16>,
    /// Retry-After hint in seconds, when the provider sent one
    pub retry_after_secs: Option<u64>,
}

impl ProviderFault {
    pub fn new(kind: FaultKind, raw_message: impl Into<String>) -> Self {
        Self {
            kind,
            raw_message: raw_message.into(),
            status: None,
            retry_after_secs: None,
        }
    }

    /// Shorthand for a [`FaultKind::ParseFailure`] fault
    pub fn parse(raw_message: impl Into<String>) -> Self {
        Self::new(FaultKind::ParseFailure, raw_message)
    }

    /// User-facing message for this fault
    pub fn user_message(&self) -> &'static str {
        self.kind.user_message()
    }
}

/// Map a raw invoker error to a fault
///
/// Total: every error yields exactly one kind. Status codes other than
/// 400, 401, 429 and 5xx fall through to [`FaultKind::Generic`].
pub fn classify(error: &InvokeError) -> ProviderFault {
    let (kind, status, retry_after_secs) = match error {
        InvokeError::Status {
            status,
            retry_after_secs,
            ..
        } => {
            let kind = match *status {
                401 => FaultKind::Auth,
                400 => FaultKind::BadRequest,
                429 => FaultKind::RateLimit,
                s if s >= 500 => FaultKind::ServerError,
                _ => FaultKind::Generic,
            };
            (kind, Some(*status), *retry_after_secs)
        }
        InvokeError::Transport {
            request_sent: true, ..
        } => (FaultKind::Network, None, None),
        InvokeError::Transport {
            request_sent: false,
            ..
        } => (FaultKind::Generic, None, None),
        InvokeError::Parse(_) => (FaultKind::ParseFailure, None, None),
        InvokeError::Other(_) => (FaultKind::Generic, None, None),
    };

    ProviderFault {
        kind,
        raw_message: error.to_string(),
        status,
        retry_after_secs,
    }
}

/// Errors returned by the dispatcher
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Neither the configured provider nor the fallback is registered
    #[error("Unsupported AI provider '{requested}' (available: {})", .available.join(", "))]
    UnsupportedProvider {
        requested: String,
        available: Vec<String>,
    },

    /// The provider handle could not be created
    #[error("Provider '{provider}' is not usable: {message}")]
    ProviderSetup { provider: String, message: String },

    /// Every attempt failed
    #[error("{provider} failed after {attempts} attempts: {last}")]
    ExhaustedRetries {
        provider: String,
        attempts: u32,
        last: ProviderFault,
    },

    /// A fault the retry policy declined to retry
    #[error("{provider} request failed: {fault}")]
    Fault {
        provider: String,
        fault: ProviderFault,
    },

    /// The request itself is invalid
    #[error("Invalid generation request: {0}")]
    InvalidRequest(#[from] TaskSetError),
}

impl GenerateError {
    /// Fault kind behind this error, for user-facing reporting
    pub fn fault_kind(&self) -> FaultKind {
        match self {
            Self::UnsupportedProvider { .. } => FaultKind::Unsupported,
            Self::ProviderSetup { .. } => FaultKind::Auth,
            Self::ExhaustedRetries { last, .. } => last.kind,
            Self::Fault { fault, .. } => fault.kind,
            Self::InvalidRequest(_) => FaultKind::BadRequest,
        }
    }
}
