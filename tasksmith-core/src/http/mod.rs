//! HTTP module for making API requests to AI providers
//!
//! This module implements the transport layer for Tasksmith, handling:
//! - Client construction with timeouts and TLS verification mode
//! - JSON request/response exchange
//! - Error extraction from provider error bodies
//! - Request ID generation for log correlation

pub mod client;
pub mod error;

pub use client::{HttpClient, HttpOptions};
pub use error::InvokeError;
