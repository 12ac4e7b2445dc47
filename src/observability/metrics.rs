//! Refresh and watch metrics.
//!
//! Lock-free atomic counters, readable at any time through
//! [`WatchMetrics::summary`].

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Thread-safe atomic counter.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Thread-safe atomic gauge.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Per-provider counters for refreshes and the watch loop.
#[derive(Debug, Default)]
pub struct WatchMetrics {
    pub refreshes_total: Counter,
    pub refreshes_failed: Counter,
    pub refresh_latency_micros: Counter,
    pub events_seen: Counter,
    pub watch_errors: Counter,
    pub changes_emitted: Counter,
    pub active_watches: Gauge,
}

impl WatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_refresh(&self, success: bool, latency_micros: u64) {
        self.refreshes_total.inc();
        self.refresh_latency_micros.add(latency_micros);
        if !success {
            self.refreshes_failed.inc();
        }
    }

    pub fn record_event(&self) {
        self.events_seen.inc();
    }

    pub fn record_watch_error(&self) {
        self.watch_errors.inc();
    }

    pub fn record_change(&self) {
        self.changes_emitted.inc();
    }

    pub fn summary(&self) -> WatchMetricsSummary {
        WatchMetricsSummary::from_metrics(self)
    }
}

/// Point-in-time snapshot of [`WatchMetrics`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchMetricsSummary {
    pub refreshes: u64,
    pub failed_refreshes: u64,
    pub events_seen: u64,
    pub watch_errors: u64,
    pub changes_emitted: u64,
    pub active_watches: i64,
    pub avg_refresh_ms: f64,
}

impl WatchMetricsSummary {
    pub fn from_metrics(metrics: &WatchMetrics) -> Self {
        let refreshes = metrics.refreshes_total.get();
        let avg_refresh_ms = if refreshes > 0 {
            metrics.refresh_latency_micros.get() as f64 / refreshes as f64 / 1000.0
        } else {
            0.0
        };

        Self {
            refreshes,
            failed_refreshes: metrics.refreshes_failed.get(),
            events_seen: metrics.events_seen.get(),
            watch_errors: metrics.watch_errors.get(),
            changes_emitted: metrics.changes_emitted.get(),
            active_watches: metrics.active_watches.get(),
            avg_refresh_ms,
        }
    }

    pub fn successful_refreshes(&self) -> u64 {
        self.refreshes - self.failed_refreshes
    }
}
