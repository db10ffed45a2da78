// Retry with exponential backoff for host API operations.
// Rate limits, timeouts and 5xx responses are transient; everything else fails fast.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, warn};

use crate::github::GitHubError;
use crate::observability::{host_metrics, HostCall};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            jitter: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GitHubRetryHandler {
    config: RetryConfig,
    timeout: Duration,
}

impl GitHubRetryHandler {
    pub fn new(config: RetryConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }

    /// Delays between attempts: `base`, `2 * base`, `4 * base`, ... capped at the
    /// maximum delay, one fewer than the attempt budget.
    pub fn backoff_schedule(&self) -> impl Iterator<Item = Duration> {
        let with_jitter = self.config.jitter;
        ExponentialBackoff::from_millis(2)
            .factor((self.config.base_delay_ms / 2).max(1))
            .max_delay(Duration::from_millis(self.config.max_delay_ms))
            .take(self.config.max_attempts.max(1) as usize - 1)
            .map(move |delay| if with_jitter { jitter(delay) } else { delay })
    }

    /// Run `operation` under the per-call timeout, retrying transient failures.
    pub async fn execute_with_retry<T, F, Fut>(
        &self,
        operation_name: &str,
        mut operation: F,
    ) -> Result<T, GitHubError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GitHubError>>,
    {
        let attempts = AtomicU32::new(0);
        let timeout = self.timeout;

        let action = || {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            host_metrics().record(HostCall::Request);
            if attempt > 1 {
                host_metrics().record(HostCall::Retried);
            }
            let call = operation();
            async move {
                match tokio::time::timeout(timeout, call).await {
                    Ok(result) => result,
                    Err(_) => Err(GitHubError::Timeout {
                        operation: operation_name.to_string(),
                        duration_ms: timeout.as_millis() as u64,
                    }),
                }
            }
        };

        let transient = |error: &GitHubError| {
            if error.is_rate_limit() {
                host_metrics().record(HostCall::RateLimited);
            }
            let retry = error.is_retryable();
            if retry {
                warn!(
                    operation = operation_name,
                    attempt = attempts.load(Ordering::Relaxed),
                    error = %error,
                    "Transient GitHub failure"
                );
            }
            retry
        };

        let result = RetryIf::spawn(self.backoff_schedule(), action, transient).await;
        match &result {
            Ok(_) if attempts.load(Ordering::Relaxed) > 1 => {
                debug!(
                    operation = operation_name,
                    attempts = attempts.load(Ordering::Relaxed),
                    "Operation succeeded after retry"
                );
            }
            Ok(_) => {}
            Err(_) => host_metrics().record(HostCall::Failed),
        }
        result
    }
}
