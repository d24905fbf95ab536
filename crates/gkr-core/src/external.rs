//! Retry-then-fallback policy for calls to external models.
//!
//! Every embedding and completion call in the pipeline goes through a
//! [`CallPolicy`]: each attempt runs under a timeout, failures are retried
//! with exponential backoff, and the final failure becomes an
//! [`ExternalServiceError`] that callers turn into a fallback value.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{ExternalServiceError, GkrError};

/// Timeout and retry settings for one external collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallPolicy {
    /// Total attempts including the first. At least 1.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff_ms: u64,
    /// Factor applied to the delay after each retry.
    pub backoff_multiplier: f64,
    /// Upper bound on any single delay.
    pub max_backoff_ms: u64,
    /// Deadline for each attempt.
    pub timeout_ms: u64,
}

impl CallPolicy {
    /// Completion calls: 3 attempts, 1s backoff doubling, 30s per attempt.
    pub fn completion_default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 1_000,
            backoff_multiplier: 2.0,
            max_backoff_ms: 10_000,
            timeout_ms: 30_000,
        }
    }

    /// Embedding calls: a single attempt with a strict 5s deadline.
    pub fn embedding_default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 0,
            backoff_multiplier: 1.0,
            max_backoff_ms: 0,
            timeout_ms: 5_000,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(retry.saturating_sub(1) as i32);
        let ms = (self.initial_backoff_ms as f64 * factor).min(self.max_backoff_ms as f64);
        Duration::from_millis(ms.max(0.0) as u64)
    }

    /// Validates the policy. `name` labels errors (e.g. "calls.completion").
    pub fn validate(&self, name: &str) -> Result<(), GkrError> {
        if self.max_attempts == 0 {
            return Err(GkrError::invalid_configuration(
                format!("{name}.maxAttempts must be at least 1"),
                "Set maxAttempts to 1 to disable retries",
            ));
        }
        if self.timeout_ms == 0 {
            return Err(GkrError::invalid_configuration(
                format!("{name}.timeoutMs must be positive"),
                "Every external call needs a deadline",
            ));
        }
        if !(self.backoff_multiplier.is_finite() && self.backoff_multiplier >= 1.0) {
            return Err(GkrError::invalid_configuration(
                format!("{name}.backoffMultiplier must be >= 1.0"),
                "Use 2.0 for exponential backoff or 1.0 for a fixed delay",
            ));
        }
        Ok(())
    }

    /// Run `op` under this policy.
    ///
    /// # Errors
    ///
    /// [`ExternalServiceError::Timeout`] when the last attempt timed out,
    /// [`ExternalServiceError::Failed`] when it returned an error.
    pub async fn call<T, E, F, Fut>(
        &self,
        service: &str,
        mut op: F,
    ) -> Result<T, ExternalServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let attempts = self.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            if attempt > 1 {
                let delay = self.backoff(attempt - 1);
                tracing::debug!(
                    service,
                    "retry attempt {}/{} after {:?}",
                    attempt,
                    attempts,
                    delay
                );
                tokio::time::sleep(delay).await;
            }

            match tokio::time::timeout(self.timeout(), op()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => {
                    tracing::debug!(service, attempt, error = %e, "external call failed");
                    last_error = Some(ExternalServiceError::Failed {
                        service: service.to_string(),
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
                Err(_) => {
                    tracing::debug!(service, attempt, timeout_ms = self.timeout_ms, "external call timed out");
                    last_error = Some(ExternalServiceError::Timeout {
                        service: service.to_string(),
                        attempts: attempt,
                        timeout_ms: self.timeout_ms,
                    });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ExternalServiceError::Failed {
            service: service.to_string(),
            attempts,
            message: "no attempt was made".to_string(),
        }))
    }

    /// Run `op` under this policy, returning `fallback` on final failure.
    pub async fn call_or<T, E, F, Fut>(&self, service: &str, op: F, fallback: T) -> T
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        match self.call(service, op).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("{e}; using fallback");
                fallback
            }
        }
    }
}

/// Policies for both collaborators (`calls:` in the config file).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallPolicies {
    #[serde(default = "CallPolicy::completion_default")]
    pub completion: CallPolicy,
    #[serde(default = "CallPolicy::embedding_default")]
    pub embedding: CallPolicy,
}

impl Default for CallPolicies {
    fn default() -> Self {
        Self {
            completion: CallPolicy::completion_default(),
            embedding: CallPolicy::embedding_default(),
        }
    }
}

impl CallPolicies {
    pub fn validate(&self) -> Result<(), GkrError> {
        self.completion.validate("calls.completion")?;
        self.embedding.validate("calls.embedding")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> CallPolicy {
        CallPolicy {
            max_attempts,
            initial_backoff_ms: 100,
            backoff_multiplier: 2.0,
            max_backoff_ms: 1_000,
            timeout_ms: 500,
        }
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = CallPolicy::completion_default();
        assert_eq!(policy.backoff(1), Duration::from_millis(1_000));
        assert_eq!(policy.backoff(2), Duration::from_millis(2_000));
        assert_eq!(policy.backoff(5), Duration::from_millis(10_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_retries() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = fast_policy(3)
            .call("completion", || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(format!("attempt {n} failed"))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = fast_policy(2)
            .call("completion", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("boom")
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            result,
            Err(ExternalServiceError::Failed {
                service: "completion".to_string(),
                attempts: 2,
                message: "boom".to_string(),
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let result = fast_policy(1)
            .call("embedding", || async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, String>(())
            })
            .await;

        assert_eq!(
            result,
            Err(ExternalServiceError::Timeout {
                service: "embedding".to_string(),
                attempts: 1,
                timeout_ms: 500,
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_or_returns_fallback() {
        let value = fast_policy(1)
            .call_or("completion", || async { Err::<String, _>("down") }, "fallback".to_string())
            .await;
        assert_eq!(value, "fallback");
    }

    #[test]
    fn test_validate() {
        assert!(CallPolicies::default().validate().is_ok());
        let bad = CallPolicy {
            max_attempts: 0,
            ..CallPolicy::embedding_default()
        };
        assert!(bad.validate("calls.embedding").is_err());
    }
}
