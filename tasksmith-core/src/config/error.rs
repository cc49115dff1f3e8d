//! Errors raised while loading and checking settings

use std::fmt;
use thiserror::Error;

/// Why settings could not be loaded
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Line and column are 1-based when the parser reports them
    #[error("cannot parse '{path}'{}: {message}", position(.line, .column))]
    Parse {
        path: String,
        line: Option<usize>,
        column: Option<usize>,
        message: String,
    },

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("environment variable '{var}' referenced in config is not set")]
    MissingEnvVar { var: String },

    #[error("environment variable '{var}' has invalid value '{value}': expected {expected}")]
    InvalidEnvValue {
        var: String,
        value: String,
        expected: String,
    },
}

fn position(line: &Option<usize>, column: &Option<usize>) -> String {
    match (*line, *column) {
        (Some(line), Some(column)) => format!(" at {}:{}", line, column),
        (Some(line), None) => format!(" at line {}", line),
        _ => String::new(),
    }
}

/// A setting that failed validation, addressed by its dotted path
#[derive(Debug, Error)]
pub struct ValidationError {
    /// e.g. `provider.max_tokens`
    pub field_path: String,
    pub kind: ValidationErrorKind,
    /// How to fix it, shown after the message
    pub hint: Option<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid setting '{}': {}", self.field_path, self.kind)?;
        match &self.hint {
            Some(hint) => write!(f, "; {}", hint),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationErrorKind {
    #[error("a value is required")]
    Missing,

    #[error("{0}")]
    OutOfRange(String),

    #[error("{0}")]
    Conflict(String),

    #[error("bad URL: {0}")]
    BadUrl(String),
}

impl ValidationError {
    pub fn new(field_path: impl Into<String>, kind: ValidationErrorKind) -> Self {
        Self {
            field_path: field_path.into(),
            kind,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn required(field_path: impl Into<String>) -> Self {
        Self::new(field_path, ValidationErrorKind::Missing)
    }

    pub fn out_of_range(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(field_path, ValidationErrorKind::OutOfRange(message.into()))
    }

    pub fn conflict(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(field_path, ValidationErrorKind::Conflict(message.into()))
    }

    pub fn invalid_url(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(field_path, ValidationErrorKind::BadUrl(message.into()))
    }
}
