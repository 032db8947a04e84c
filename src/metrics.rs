use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Action run times over the most recent deliveries of one stage
#[derive(Debug, Clone)]
pub struct LatencyWindow {
    samples: Arc<Mutex<VecDeque<Duration>>>,
    capacity: usize,
}

/// Percentiles of a [`LatencyWindow`], computed from one sorted copy
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencySummary {
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub max: Duration,
}

impl LatencyWindow {
    /// Keep the last `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    /// Record how long one action call took
    pub fn record(&self, elapsed: Duration) {
        let mut samples = self.samples.lock();
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(elapsed);
    }

    /// Number of samples currently in the window
    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    /// Check if nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nearest-rank percentiles over the current window; zero when empty
    pub fn summary(&self) -> LatencySummary {
        let mut sorted: Vec<Duration> = self.samples.lock().iter().copied().collect();
        if sorted.is_empty() {
            return LatencySummary::default();
        }
        sorted.sort_unstable();

        let rank = |p: f64| {
            let idx = ((sorted.len() as f64 * p).ceil() as usize).saturating_sub(1);
            sorted[idx]
        };
        LatencySummary {
            p50: rank(0.50),
            p95: rank(0.95),
            p99: rank(0.99),
            max: sorted[sorted.len() - 1],
        }
    }
}

/// Per-stage counters, shared between the stage handle and its worker
#[derive(Debug, Clone)]
pub struct StageMetrics {
    items_added: Arc<AtomicU64>,
    items_delivered: Arc<AtomicU64>,
    action_failures: Arc<AtomicU64>,
    /// Items still queued when the stage was stopped
    items_discarded: Arc<AtomicU64>,
    /// Action execution time
    latency: LatencyWindow,
    start_time: Instant,
}

impl StageMetrics {
    pub fn new() -> Self {
        Self {
            items_added: Arc::new(AtomicU64::new(0)),
            items_delivered: Arc::new(AtomicU64::new(0)),
            action_failures: Arc::new(AtomicU64::new(0)),
            items_discarded: Arc::new(AtomicU64::new(0)),
            latency: LatencyWindow::new(1000),
            start_time: Instant::now(),
        }
    }

    pub fn record_added(&self) {
        self.items_added.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an item handed to the action, successful or not
    pub fn record_delivered(&self, elapsed: Duration) {
        self.items_delivered.fetch_add(1, Ordering::Relaxed);
        self.latency.record(elapsed);
    }

    pub fn record_failure(&self) {
        self.action_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discarded(&self, count: u64) {
        self.items_discarded.fetch_add(count, Ordering::Relaxed);
    }

    pub fn total_added(&self) -> u64 {
        self.items_added.load(Ordering::Relaxed)
    }

    pub fn total_delivered(&self) -> u64 {
        self.items_delivered.load(Ordering::Relaxed)
    }

    pub fn total_failures(&self) -> u64 {
        self.action_failures.load(Ordering::Relaxed)
    }

    pub fn total_discarded(&self) -> u64 {
        self.items_discarded.load(Ordering::Relaxed)
    }

    /// Delivered items per second since the stage was created
    pub fn throughput_ips(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            0.0
        } else {
            self.total_delivered() as f64 / elapsed
        }
    }

    /// Action latency percentiles over the recent window
    pub fn latency(&self) -> LatencySummary {
        self.latency.summary()
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let latency = self.latency.summary();
        MetricsSnapshot {
            total_added: self.total_added(),
            total_delivered: self.total_delivered(),
            total_failures: self.total_failures(),
            total_discarded: self.total_discarded(),
            throughput_ips: self.throughput_ips(),
            latency,
            elapsed: self.start_time.elapsed(),
        }
    }
}

impl Default for StageMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub total_added: u64,
    pub total_delivered: u64,
    pub total_failures: u64,
    pub total_discarded: u64,
    pub throughput_ips: f64,
    pub latency: LatencySummary,
    pub elapsed: Duration,
}

impl MetricsSnapshot {
    /// Format metrics as a human-readable string
    pub fn format(&self) -> String {
        format!(
            "Added: {}, Delivered: {}, Failed: {}, Discarded: {}, Throughput: {:.2} items/s, \
             Action P50: {:.2?}, P95: {:.2?}, P99: {:.2?}, Max: {:.2?}, Elapsed: {:.2}s",
            self.total_added,
            self.total_delivered,
            self.total_failures,
            self.total_discarded,
            self.throughput_ips,
            self.latency.p50,
            self.latency.p95,
            self.latency.p99,
            self.latency.max,
            self.elapsed.as_secs_f64()
        )
    }
}
