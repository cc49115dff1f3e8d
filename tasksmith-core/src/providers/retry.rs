//! Retry policy and executor for provider calls
//!
//! The attempt budget and the delay between attempts are configured
//! separately: [`RetryPolicy::max_retries`] bounds the number of attempts and
//! [`BackoffStrategy`] decides how long to wait before each retry.

use crate::config::ValidationError;
use crate::providers::error::{FaultKind, ProviderFault};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Delay strategy between attempts
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Retry immediately
    #[default]
    None,

    /// Wait the same delay before every retry
    Fixed { delay_ms: u64 },

    /// Exponential backoff with jitter
    Exponential {
        /// Delay before the first retry (milliseconds)
        initial_delay_ms: u64,
        /// Upper bound for any single delay (milliseconds)
        max_delay_ms: u64,
        /// Growth factor per retry (e.g., 2.0 for doubling)
        base: f64,
        /// Jitter factor (0.0 to 1.0) to randomize delays
        jitter_factor: f64,
    },
}

impl BackoffStrategy {
    /// Exponential backoff with the usual defaults
    pub fn exponential() -> Self {
        Self::Exponential {
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            base: 2.0,
            jitter_factor: 0.1,
        }
    }
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (not including the initial attempt)
    pub max_retries: u32,

    /// Delay strategy between attempts
    pub backoff: BackoffStrategy,

    /// Whether parse failures are retried like transport faults
    pub retry_parse_failures: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: BackoffStrategy::None,
            retry_parse_failures: true,
        }
    }
}

impl RetryPolicy {
    /// Create a flat retry policy with the given retry budget
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Create a policy with no retries
    pub fn no_retry() -> Self {
        Self::new(0)
    }

    /// Use the given backoff strategy
    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set whether parse failures are retried
    pub fn with_parse_retries(mut self, enabled: bool) -> Self {
        self.retry_parse_failures = enabled;
        self
    }

    /// Total number of attempts, including the first one
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Calculate the delay before retry number `retry` (0-based)
    pub fn calculate_delay(&self, retry: u32, fault: &ProviderFault) -> Duration {
        match &self.backoff {
            BackoffStrategy::None => Duration::ZERO,
            BackoffStrategy::Fixed { delay_ms } => Duration::from_millis(*delay_ms),
            BackoffStrategy::Exponential {
                initial_delay_ms,
                max_delay_ms,
                base,
                jitter_factor,
            } => {
                // a provider hint wins but never exceeds the per-delay cap
                if let Some(secs) = fault.retry_after_secs {
                    return Duration::from_secs(secs).min(Duration::from_millis(*max_delay_ms));
                }

                let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
                let base_delay = *initial_delay_ms as f64 * base.powi(exponent);
                let capped_delay = base_delay.min(*max_delay_ms as f64);

                let delay_with_jitter = if *jitter_factor > 0.0 {
                    let jitter_range = capped_delay * jitter_factor;
                    let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
                    (capped_delay + jitter).max(0.0)
                } else {
                    capped_delay
                };

                Duration::from_millis(delay_with_jitter as u64)
            }
        }
    }

    /// Whether the given fault may be retried at all
    pub fn is_retryable(&self, fault: &ProviderFault) -> bool {
        match fault.kind {
            FaultKind::ParseFailure => self.retry_parse_failures,
            FaultKind::Unsupported => false,
            _ => true,
        }
    }

    /// Check if we should retry after `retries_done` retries
    pub fn should_retry(&self, fault: &ProviderFault, retries_done: u32) -> bool {
        retries_done < self.max_retries && self.is_retryable(fault)
    }

    /// Validate retry policy
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if let BackoffStrategy::Exponential {
            initial_delay_ms,
            max_delay_ms,
            base,
            jitter_factor,
        } = &self.backoff
        {
            if *initial_delay_ms == 0 {
                return Err(ValidationError::out_of_range(
                    format!("{}.backoff.initial_delay_ms", path),
                    "Must be greater than 0",
                ));
            }
            if max_delay_ms < initial_delay_ms {
                return Err(ValidationError::out_of_range(
                    format!("{}.backoff.max_delay_ms", path),
                    "Must be >= initial_delay_ms",
                ));
            }
            if *base < 1.0 {
                return Err(ValidationError::out_of_range(
                    format!("{}.backoff.base", path),
                    "Must be at least 1.0",
                ));
            }
            if !(0.0..=1.0).contains(jitter_factor) {
                return Err(ValidationError::out_of_range(
                    format!("{}.backoff.jitter_factor", path),
                    "Must be between 0.0 and 1.0",
                ));
            }
        }

        Ok(())
    }
}

/// Result of a retry operation
#[derive(Debug, Clone)]
pub struct RetryOutcome<T> {
    /// The successful result, or the last fault
    pub result: Result<T, ProviderFault>,

    /// Number of retries performed (attempts minus one)
    pub retries: u32,

    /// Whether the attempt budget was spent
    pub exhausted: bool,

    /// Total time spent waiting between attempts
    pub total_delay_ms: u64,

    /// All faults encountered, in order
    pub fault_history: Vec<ProviderFault>,
}

impl<T> RetryOutcome<T> {
    /// Number of attempts made, including the first
    pub fn attempts(&self) -> u32 {
        self.retries + 1
    }
}

/// Executor for retry operations
pub struct RetryExecutor<'a> {
    policy: &'a RetryPolicy,
    label: &'a str,
}

impl<'a> RetryExecutor<'a> {
    /// Create a new retry executor; `label` names the operation in logs
    pub fn new(policy: &'a RetryPolicy, label: &'a str) -> Self {
        Self { policy, label }
    }

    /// Execute an operation with retry logic
    pub async fn execute<F, T, Fut>(&self, mut operation: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ProviderFault>>,
    {
        let mut retries = 0;
        let mut total_delay_ms = 0;
        let mut fault_history = Vec::new();

        loop {
            match operation(retries).await {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        retries,
                        exhausted: false,
                        total_delay_ms,
                        fault_history,
                    };
                }
                Err(fault) => {
                    warn!(
                        operation = self.label,
                        attempt = retries + 1,
                        kind = %fault.kind,
                        "{} {}",
                        fault.user_message(),
                        fault.raw_message
                    );
                    fault_history.push(fault.clone());

                    if !self.policy.should_retry(&fault, retries) {
                        let exhausted =
                            retries >= self.policy.max_retries && self.policy.is_retryable(&fault);
                        return RetryOutcome {
                            result: Err(fault),
                            retries,
                            exhausted,
                            total_delay_ms,
                            fault_history,
                        };
                    }

                    let delay = self.policy.calculate_delay(retries, &fault);
                    if !delay.is_zero() {
                        total_delay_ms += delay.as_millis() as u64;
                        tokio::time::sleep(delay).await;
                    }
                    retries += 1;
                }
            }
        }
    }
}
