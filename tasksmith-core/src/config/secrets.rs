//! Secret handling for provider credentials
//!
//! API keys are wrapped in [`SecretString`] so they never leak through
//! `Debug`/`Display` output or tracing fields.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A wrapper type for sensitive strings like API keys
#[derive(Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    /// Create a new secret string
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Get the actual value (use with caution)
    pub fn expose_secret(&self) -> &str {
        &self.value
    }

    /// Check if the secret is empty
    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }

    /// Get a partially redacted version for diagnostics
    pub fn partial_redact(&self) -> String {
        if self.value.is_empty() {
            return "[EMPTY]".to_string();
        }

        let len = self.value.len();
        if len <= 8 || !self.value.is_ascii() {
            "[REDACTED]".to_string()
        } else if self.value.starts_with("sk-") || self.value.starts_with("pplx-") {
            let prefix_end = self.value.find('-').map(|i| i + 1).unwrap_or(3);
            format!("{}...{}", &self.value[..prefix_end], &self.value[len - 4..])
        } else {
            format!("{}...{}", &self.value[..2], &self.value[len - 2..])
        }
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
