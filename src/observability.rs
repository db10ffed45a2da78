use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Outcome of one host API attempt, as counted by [`HostApiMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCall {
    Request,
    RateLimited,
    Retried,
    Failed,
}

/// Process-wide host API counters.
#[derive(Debug, Default)]
pub struct HostApiMetrics {
    counters: [AtomicU64; 4],
}

impl HostApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(call: HostCall) -> usize {
        match call {
            HostCall::Request => 0,
            HostCall::RateLimited => 1,
            HostCall::Retried => 2,
            HostCall::Failed => 3,
        }
    }

    pub fn record(&self, call: HostCall) {
        if call == HostCall::RateLimited {
            warn!("GitHub API rate limit hit");
        }
        self.counters[Self::slot(call)].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self, call: HostCall) -> u64 {
        self.counters[Self::slot(call)].load(Ordering::Relaxed)
    }

    pub fn log_stats(&self) {
        info!(
            requests = self.count(HostCall::Request),
            rate_limits = self.count(HostCall::RateLimited),
            retries = self.count(HostCall::Retried),
            errors = self.count(HostCall::Failed),
            "GitHub API usage"
        );
    }
}

static HOST_METRICS: LazyLock<HostApiMetrics> = LazyLock::new(HostApiMetrics::new);

pub fn host_metrics() -> &'static HostApiMetrics {
    &HOST_METRICS
}

/// Span wrapping one governance pass over a repository.
pub fn create_pass_span(pass: &str, repository: &str, correlation_id: &str) -> tracing::Span {
    tracing::info_span!(
        "governance_pass",
        pass.name = pass,
        repository = repository,
        correlation.id = correlation_id,
    )
}

/// Wall-clock timer for a CLI command, logged on finish.
pub struct OperationTimer {
    label: String,
    started: Instant,
}

impl OperationTimer {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            started: Instant::now(),
        }
    }

    pub fn finish(self) -> Duration {
        let elapsed = self.started.elapsed();
        info!(
            command = %self.label,
            duration_ms = elapsed.as_millis() as u64,
            "Command finished"
        );
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_independent() {
        let metrics = HostApiMetrics::new();
        metrics.record(HostCall::Request);
        metrics.record(HostCall::Request);
        metrics.record(HostCall::Retried);
        metrics.record(HostCall::Failed);

        assert_eq!(metrics.count(HostCall::Request), 2);
        assert_eq!(metrics.count(HostCall::Retried), 1);
        assert_eq!(metrics.count(HostCall::Failed), 1);
        assert_eq!(metrics.count(HostCall::RateLimited), 0);
    }
}
