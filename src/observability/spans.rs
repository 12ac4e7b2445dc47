//! Structured span definitions for tracing.

use std::time::Instant;

use tracing::{Level, Span, field, span};

use crate::auth::ProviderType;

/// Span around one credential refresh.
pub struct RefreshSpan {
    span: Span,
    start: Instant,
}

impl RefreshSpan {
    pub fn new(provider: ProviderType, base_dir: &str) -> Self {
        let span = span!(
            Level::INFO,
            "credentials.refresh",
            provider = %provider,
            base_dir = base_dir,
            success = field::Empty,
            error = field::Empty,
            latency_ms = field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
        }
    }

    pub fn record_success(&self) {
        self.span.record("success", true);
    }

    pub fn record_failure(&self, error: &crate::Error) {
        self.span.record("success", false);
        self.span.record("error", field::display(error));
    }

    /// Record latency and return it in microseconds.
    pub fn finish(self) -> u64 {
        let elapsed = self.start.elapsed();
        let latency_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.span.record("latency_ms", latency_ms);
        u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}
