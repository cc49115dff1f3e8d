//! HTTP client implementation using reqwest

use crate::config::{ConnectionConfig, TlsVerification};
use crate::http::error::{extract_error_message, parse_retry_after, InvokeError};
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, ClientBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Maximum response size (10MB)
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// Only this much of an error body is kept for the message
const MAX_ERROR_BODY_SIZE: usize = 64 * 1024;

/// Default user agent
const USER_AGENT: &str = concat!("tasksmith/", env!("CARGO_PKG_VERSION"));

/// Options used to build an [`HttpClient`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpOptions {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub tls: TlsVerification,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self::from_config(&ConnectionConfig::default(), TlsVerification::Strict)
    }
}

impl HttpOptions {
    /// Build options from connection settings and a TLS mode
    pub fn from_config(connection: &ConnectionConfig, tls: TlsVerification) -> Self {
        Self {
            connect_timeout: Duration::from_millis(connection.connect_timeout_ms),
            request_timeout: Duration::from_millis(connection.request_timeout_ms),
            tls,
        }
    }
}

/// JSON-over-HTTP client shared by the provider invokers
#[derive(Clone)]
pub struct HttpClient {
    /// The underlying reqwest client
    client: Client,

    /// Maximum response size to prevent OOM
    max_response_size: usize,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, InvokeError> {
        Self::with_options(HttpOptions::default())
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_options(options: HttpOptions) -> Result<Self, InvokeError> {
        let mut builder = ClientBuilder::new()
            .connect_timeout(options.connect_timeout)
            .timeout(options.request_timeout)
            .user_agent(USER_AGENT)
            .gzip(true);

        if options.tls == TlsVerification::Disabled {
            warn!("TLS certificate verification is disabled; use this only for development");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(|e| InvokeError::Transport {
            message: format!("Failed to create HTTP client: {}", e),
            request_sent: false,
        })?;

        Ok(Self {
            client,
            max_response_size: MAX_RESPONSE_SIZE,
        })
    }

    /// Override the response size limit
    pub fn with_max_response_size(mut self, max_response_size: usize) -> Self {
        self.max_response_size = max_response_size;
        self
    }

    /// POST a JSON body and decode the JSON response
    ///
    /// Non-success statuses become [`InvokeError::Status`] carrying the
    /// provider's error message and any Retry-After hint.
    pub async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &Value,
    ) -> Result<Value, InvokeError> {
        let request_id = Uuid::new_v4();
        debug!("POST {} [request_id: {}]", url, request_id);

        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| InvokeError::Other(format!("Invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| InvokeError::Other(format!("Invalid value for header {}: {}", name, e)))?;
            header_map.insert(name, value);
        }
        header_map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = self
            .client
            .post(url)
            .headers(header_map)
            .header("X-Request-ID", request_id.to_string())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!("Request error for {} [request_id: {}]: {}", url, request_id, e);
                InvokeError::from(e)
            })?;

        let status = response.status();
        debug!("Response status: {} [request_id: {}]", status, request_id);

        if !status.is_success() {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            let body = match read_capped(response, MAX_ERROR_BODY_SIZE).await {
                Ok((bytes, _)) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(_) => String::new(),
            };

            warn!(
                "Request failed with status {} [request_id: {}]",
                status, request_id
            );

            return Err(InvokeError::Status {
                status: status.as_u16(),
                message: extract_error_message(&body)
                    .unwrap_or_else(|| format!("HTTP error {}", status.as_u16())),
                retry_after_secs,
            });
        }

        if let Some(content_length) = response.content_length() {
            if content_length as usize > self.max_response_size {
                return Err(InvokeError::Other(format!(
                    "Response size {} exceeds maximum {} [request_id: {}]",
                    content_length, self.max_response_size, request_id
                )));
            }
        }

        let (body, truncated) = read_capped(response, self.max_response_size)
            .await
            .map_err(|e| InvokeError::Transport {
                message: format!("Failed to read response body: {} [request_id: {}]", e, request_id),
                request_sent: true,
            })?;

        if truncated {
            return Err(InvokeError::Other(format!(
                "Response exceeds maximum size {} [request_id: {}]",
                self.max_response_size, request_id
            )));
        }

        serde_json::from_slice(&body).map_err(|e| {
            error!(
                "Failed to parse response body [request_id: {}]: {}",
                request_id, e
            );
            InvokeError::Parse(format!("Invalid response body: {} [request_id: {}]", e, request_id))
        })
    }
}

/// Read the body chunk by chunk, stopping once `limit` bytes are buffered
///
/// The flag is true when the body was longer than `limit`.
async fn read_capped(response: Response, limit: usize) -> Result<(Vec<u8>, bool), reqwest::Error> {
    let mut stream = response.bytes_stream();
    let mut buffer = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let room = limit - buffer.len();
        if chunk.len() > room {
            buffer.extend_from_slice(&chunk[..room]);
            return Ok((buffer, true));
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok((buffer, false))
}
