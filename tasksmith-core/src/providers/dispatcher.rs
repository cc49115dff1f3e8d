//! Generation dispatcher
//!
//! Resolves the configured provider, invokes it under the retry policy and
//! normalizes the response. Calls are sequential: one request is in flight
//! per generation, including across retries.

use crate::config::{ProviderConfig, Settings};
use crate::prompt::{subtask_prompt, task_generation_prompt};
use crate::providers::adapter::{EnvelopeKind, Prompt};
use crate::providers::error::{classify, GenerateError, ProviderFault};
use crate::providers::normalize::{normalize_subtasks, normalize_task_set};
use crate::providers::registry::ProviderRegistry;
use crate::providers::retry::{RetryExecutor, RetryPolicy};
use crate::tasks::{Subtask, Task, TaskSet, TaskSetError, TaskSpecRequest};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

/// A successful generation
#[derive(Debug, Clone, PartialEq)]
pub struct Generation<T> {
    /// The normalized result
    pub value: T,
    /// Tag of the provider that produced it
    pub provider: String,
    /// Retries performed before the successful attempt
    pub retries: u32,
    /// Faults from the failed attempts, in order
    pub faults: Vec<ProviderFault>,
}

/// Runs generation requests against the provider registry
pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
    retry: RetryPolicy,
    strict_validation: bool,
}

impl Dispatcher {
    /// Create a dispatcher with the default retry policy
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            retry: RetryPolicy::default(),
            strict_validation: false,
        }
    }

    /// Create a dispatcher using the retry and validation settings
    pub fn from_settings(registry: Arc<ProviderRegistry>, settings: &Settings) -> Self {
        Self::new(registry)
            .with_retry_policy(settings.retry.clone())
            .with_strict_validation(settings.strict_validation)
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Validate generated task sets before accepting them
    pub fn with_strict_validation(mut self, strict: bool) -> Self {
        self.strict_validation = strict;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Generate a task set from a requirements document
    pub async fn generate(
        &self,
        config: &ProviderConfig,
        request: &TaskSpecRequest,
    ) -> Result<Generation<TaskSet>, GenerateError> {
        if request.requested_task_count == 0 {
            return Err(TaskSetError::ZeroTaskCount.into());
        }

        let prompt = task_generation_prompt(request);
        let strict = self.strict_validation;

        info!(
            source = %request.source_identifier,
            num_tasks = request.requested_task_count,
            "Generating tasks"
        );

        self.run("generate", config, &prompt, |raw, kind| {
            let task_set = normalize_task_set(raw, kind)?;
            if strict {
                task_set.validate().map_err(|e| {
                    ProviderFault::parse(format!("Generated task set is invalid: {}", e))
                })?;
            }
            Ok(task_set)
        })
        .await
    }

    /// Break a task down into subtasks
    pub async fn expand(
        &self,
        config: &ProviderConfig,
        task: &Task,
        subtask_count: u32,
        extra_context: Option<&str>,
    ) -> Result<Generation<Vec<Subtask>>, GenerateError> {
        if subtask_count == 0 {
            return Err(TaskSetError::ZeroTaskCount.into());
        }

        let prompt = subtask_prompt(task, subtask_count, extra_context);
        info!(task = task.id, num_subtasks = subtask_count, "Expanding task");

        self.run("expand", config, &prompt, normalize_subtasks).await
    }

    async fn run<T, N>(
        &self,
        operation: &str,
        config: &ProviderConfig,
        prompt: &Prompt,
        normalizer: N,
    ) -> Result<Generation<T>, GenerateError>
    where
        N: Fn(&Value, EnvelopeKind) -> Result<T, ProviderFault>,
    {
        let tag = self.registry.resolve(&config.provider_name)?;
        let provider = self.registry.handle(&tag)?;
        debug!(provider = %tag, description = %provider.describe(), "Dispatching {}", operation);

        let normalizer = &normalizer;
        let executor = RetryExecutor::new(&self.retry, operation);
        let outcome = executor
            .execute(|attempt| {
                let provider = Arc::clone(&provider);
                async move {
                    debug!(provider = provider.tag(), attempt = attempt + 1, "Invoking provider");
                    let raw = provider
                        .invoke(config, prompt)
                        .await
                        .map_err(|e| classify(&e))?;
                    normalizer(&raw, provider.envelope())
                }
            })
            .await;

        let attempts = outcome.attempts();
        match outcome.result {
            Ok(value) => {
                info!(provider = %tag, retries = outcome.retries, "{} succeeded", operation);
                Ok(Generation {
                    value,
                    provider: tag,
                    retries: outcome.retries,
                    faults: outcome.fault_history,
                })
            }
            Err(last) if outcome.exhausted => {
                error!(
                    provider = %tag,
                    attempts = attempts,
                    kind = %last.kind,
                    "{} failed after all attempts",
                    operation
                );
                Err(GenerateError::ExhaustedRetries {
                    provider: tag,
                    attempts,
                    last,
                })
            }
            Err(fault) => Err(GenerateError::Fault {
                provider: tag,
                fault,
            }),
        }
    }
}
