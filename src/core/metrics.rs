//! Logger metrics
//!
//! Counters describing how records travelled through the logger: how many
//! were dispatched, how many lines reached sinks, and how many were lost to
//! sink failures or a full async queue.

use std::sync::atomic::{AtomicU64, Ordering};

/// # Example
///
/// ```
/// use context_logger_system::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
/// metrics.record_dispatched();
/// metrics.record_written();
///
/// assert_eq!(metrics.dispatched(), 1);
/// assert_eq!(metrics.lines_written(), 1);
/// ```
#[derive(Debug, Default)]
pub struct LoggerMetrics {
    /// Records handed to the sink registry
    dispatched: AtomicU64,

    /// Lines accepted by a sink
    lines_written: AtomicU64,

    /// Sink writes that returned an error or panicked
    sink_failures: AtomicU64,

    /// (record, sink) pairs skipped by a sink threshold
    filtered: AtomicU64,

    /// Records dropped because the async queue was full
    dropped: AtomicU64,

    /// Number of times the async queue was found full
    queue_full_events: AtomicU64,
}

impl LoggerMetrics {
    pub const fn new() -> Self {
        Self {
            dispatched: AtomicU64::new(0),
            lines_written: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            queue_full_events: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn lines_written(&self) -> u64 {
        self.lines_written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn filtered(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queue_full_events(&self) -> u64 {
        self.queue_full_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_written(&self) {
        self.lines_written.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dropped record; returns the previous drop count
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_queue_full(&self) {
        self.queue_full_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Percentage of sink writes that failed
    pub fn failure_rate(&self) -> f64 {
        let failed = self.sink_failures() as f64;
        let total = failed + self.lines_written() as f64;
        if total == 0.0 {
            0.0
        } else {
            failed / total * 100.0
        }
    }
}
