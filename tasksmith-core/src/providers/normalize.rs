//! Response normalization
//!
//! Pulls the JSON payload out of a provider envelope and parses it. The
//! lookup order is fixed and the first match wins:
//!
//! 1. `content[0].text`
//! 2. `content` as a string
//! 3. `message.content`
//! 4. `choices[0].message.content`
//!
//! The payload is parsed strictly; markdown fences or trailing commas are
//! a parse failure.

use crate::providers::adapter::EnvelopeKind;
use crate::providers::error::ProviderFault;
use crate::tasks::{Subtask, TaskSet};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

const CONTENT_PATHS: [&str; 4] = [
    "/content/0/text",
    "/content",
    "/message/content",
    "/choices/0/message/content",
];

/// Extract the payload text from an envelope
pub fn extract_payload(raw: &Value) -> Option<&str> {
    CONTENT_PATHS
        .iter()
        .find_map(|path| raw.pointer(path).and_then(Value::as_str))
}

/// Extract and parse the JSON payload of a provider response
pub fn normalize(raw: &Value, kind: EnvelopeKind) -> Result<Value, ProviderFault> {
    let text = extract_payload(raw).ok_or_else(|| {
        ProviderFault::parse(format!("No content found in {} response", kind))
    })?;

    debug!(envelope = %kind, bytes = text.len(), "Extracted provider payload");

    serde_json::from_str(text).map_err(|e| {
        ProviderFault::parse(format!(
            "Content of {} response is not valid JSON: {}",
            kind, e
        ))
    })
}

/// Normalize a response into a [`TaskSet`]
pub fn normalize_task_set(raw: &Value, kind: EnvelopeKind) -> Result<TaskSet, ProviderFault> {
    let value = normalize(raw, kind)?;
    into_typed(value, "task set")
}

/// Normalize a response into a list of subtasks
///
/// Accepts either a bare JSON array or an object with a `subtasks` array.
pub fn normalize_subtasks(raw: &Value, kind: EnvelopeKind) -> Result<Vec<Subtask>, ProviderFault> {
    let value = match normalize(raw, kind)? {
        Value::Object(mut map) if map.contains_key("subtasks") => map
            .remove("subtasks")
            .unwrap_or(Value::Null),
        other => other,
    };
    into_typed(value, "subtask list")
}

fn into_typed<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, ProviderFault> {
    serde_json::from_value(value)
        .map_err(|e| ProviderFault::parse(format!("Response is not a valid {}: {}", what, e)))
}
