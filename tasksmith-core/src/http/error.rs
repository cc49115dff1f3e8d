//! Raw transport errors and HTTP error-body helpers

use serde_json::Value;
use thiserror::Error;

/// Failure of a single provider call, before classification
///
/// The variants keep exactly what the classifier needs: the HTTP status when
/// a response arrived, and whether the request left the process when it did not.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvokeError {
    /// The provider answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        message: String,
        retry_after_secs: Option<u64>,
    },

    /// No response was received
    #[error("{message}")]
    Transport { message: String, request_sent: bool },

    /// A response arrived but its body could not be decoded
    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("{0}")]
    Other(String),
}

impl InvokeError {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for InvokeError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            InvokeError::Status {
                status: status.as_u16(),
                message: err.to_string(),
                retry_after_secs: None,
            }
        } else if err.is_decode() {
            InvokeError::Parse(err.to_string())
        } else if err.is_builder() {
            InvokeError::Transport {
                message: format!("Failed to build request: {}", err),
                request_sent: false,
            }
        } else if err.is_timeout() {
            InvokeError::Transport {
                message: format!("Request timed out: {}", err),
                request_sent: true,
            }
        } else if err.is_connect() {
            InvokeError::Transport {
                message: format!("Connection failed: {}", err),
                request_sent: true,
            }
        } else if err.is_request() || err.is_body() {
            InvokeError::Transport {
                message: err.to_string(),
                request_sent: true,
            }
        } else {
            InvokeError::Other(err.to_string())
        }
    }
}

/// Extract a human-readable message from an error response body
///
/// Understands `{"error": {"message": ..}}` (OpenAI, Anthropic),
/// `{"message": ..}` and `{"error": ".."}`. Falls back to the raw body.
pub fn extract_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Ok(json) = serde_json::from_str::<Value>(trimmed) else {
        return Some(trimmed.to_string());
    };

    json.pointer("/error/message")
        .and_then(Value::as_str)
        .or_else(|| json.get("message").and_then(Value::as_str))
        .or_else(|| json.get("error").and_then(Value::as_str))
        .map(str::to_string)
        .or_else(|| Some(trimmed.to_string()))
}

/// Parse a Retry-After header value given in seconds
pub fn parse_retry_after(header_value: &str) -> Option<u64> {
    header_value.trim().parse::<u64>().ok()
}
