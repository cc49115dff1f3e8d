//! AI provider layer
//!
//! Invokers for each supported provider, the registry that selects them,
//! and the dispatcher that retries, classifies and normalizes their output.

pub mod adapter;
pub mod anthropic;
pub mod cursor;
pub mod dispatcher;
pub mod error;
pub mod normalize;
pub mod openai;
pub mod registry;
pub mod retry;

pub use adapter::{EnvelopeKind, Prompt, RawProviderResponse, TaskProvider};
pub use dispatcher::{Dispatcher, Generation};
pub use error::{classify, FaultKind, GenerateError, ProviderFault};
pub use normalize::{normalize, normalize_subtasks, normalize_task_set};
pub use registry::ProviderRegistry;
pub use retry::{BackoffStrategy, RetryExecutor, RetryOutcome, RetryPolicy};

// Re-export concrete providers
pub use anthropic::AnthropicProvider;
pub use cursor::CursorProvider;
pub use openai::OpenAIProvider;
