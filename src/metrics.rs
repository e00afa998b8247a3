use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Which function handled a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Assistant,
    Suggestions,
    Autocomplete,
}

/// Counters for the functions service
///
/// Thread-safe atomic counters shared by all handlers.
#[derive(Default)]
pub struct FunctionMetrics {
    pub assistant_requests: AtomicU64,
    pub suggestion_requests: AtomicU64,
    pub autocomplete_requests: AtomicU64,

    /// Requests answered without an upstream failure
    pub successes: AtomicU64,

    /// Gateway answered 429
    pub rate_limited: AtomicU64,

    /// Gateway answered 402
    pub credits_exhausted: AtomicU64,

    /// Any other gateway, transport or validation failure
    pub failures: AtomicU64,

    /// Suggestions replaced by defaults because the reply was unparseable
    pub fallback_suggestions: AtomicU64,

    /// Total upstream time in microseconds
    pub total_upstream_time_us: AtomicU64,
}

impl FunctionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, function: Function) {
        let counter = match function {
            Function::Assistant => &self.assistant_requests,
            Function::Suggestions => &self.suggestion_requests,
            Function::Autocomplete => &self.autocomplete_requests,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self, duration: Duration) {
        self.successes.fetch_add(1, Ordering::Relaxed);
        self.total_upstream_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_credits_exhausted(&self) {
        self.credits_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback_suggestion(&self) {
        self.fallback_suggestions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.assistant_requests.load(Ordering::Relaxed)
            + self.suggestion_requests.load(Ordering::Relaxed)
            + self.autocomplete_requests.load(Ordering::Relaxed)
    }

    /// Average upstream time of successful requests in microseconds
    pub fn avg_upstream_time_us(&self) -> u64 {
        let total = self.total_upstream_time_us.load(Ordering::Relaxed);
        let count = self.successes.load(Ordering::Relaxed);
        if count > 0 { total / count } else { 0 }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            assistant_requests: self.assistant_requests.load(Ordering::Relaxed),
            suggestion_requests: self.suggestion_requests.load(Ordering::Relaxed),
            autocomplete_requests: self.autocomplete_requests.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            credits_exhausted: self.credits_exhausted.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            fallback_suggestions: self.fallback_suggestions.load(Ordering::Relaxed),
            avg_upstream_time_us: self.avg_upstream_time_us(),
        }
    }
}

/// Immutable snapshot of metrics at a point in time
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub assistant_requests: u64,
    pub suggestion_requests: u64,
    pub autocomplete_requests: u64,
    pub successes: u64,
    pub rate_limited: u64,
    pub credits_exhausted: u64,
    pub failures: u64,
    pub fallback_suggestions: u64,
    pub avg_upstream_time_us: u64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Function Metrics: {} chat, {} suggestions, {} autocomplete; {} ok, {} rate limited, {} out of credits, {} failed, avg {:.2}ms",
            self.assistant_requests,
            self.suggestion_requests,
            self.autocomplete_requests,
            self.successes,
            self.rate_limited,
            self.credits_exhausted,
            self.failures,
            self.avg_upstream_time_us as f64 / 1000.0
        )
    }
}
