//! Lock-free counters for fare computation and notification delivery
//!
//! NOTE: All atomics use Relaxed ordering intentionally. These are statistical
//! counters only and must not be used for coordination.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

pub struct Metrics {
    started_at: Instant,
    fares_computed: AtomicU64,
    fares_rejected: AtomicU64,
    broadcasts_total: AtomicU64,
    deliveries_total: AtomicU64,
    observer_failures_total: AtomicU64,
    /// Events a channel observer could not enqueue (full or closed channel)
    channel_dropped_total: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            fares_computed: AtomicU64::new(0),
            fares_rejected: AtomicU64::new(0),
            broadcasts_total: AtomicU64::new(0),
            deliveries_total: AtomicU64::new(0),
            observer_failures_total: AtomicU64::new(0),
            channel_dropped_total: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_fare(&self) {
        self.fares_computed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_fare_rejected(&self) {
        self.fares_rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_broadcast(&self, delivered: u64, failed: u64) {
        self.broadcasts_total.fetch_add(1, Ordering::Relaxed);
        self.deliveries_total.fetch_add(delivered, Ordering::Relaxed);
        self.observer_failures_total.fetch_add(failed, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_channel_drop(&self) {
        self.channel_dropped_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fares_computed(&self) -> u64 {
        self.fares_computed.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            uptime_secs: self.started_at.elapsed().as_secs_f64(),
            fares_computed: self.fares_computed.load(Ordering::Relaxed),
            fares_rejected: self.fares_rejected.load(Ordering::Relaxed),
            broadcasts_total: self.broadcasts_total.load(Ordering::Relaxed),
            deliveries_total: self.deliveries_total.load(Ordering::Relaxed),
            observer_failures_total: self.observer_failures_total.load(Ordering::Relaxed),
            channel_dropped_total: self.channel_dropped_total.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSummary {
    pub uptime_secs: f64,
    pub fares_computed: u64,
    pub fares_rejected: u64,
    pub broadcasts_total: u64,
    pub deliveries_total: u64,
    pub observer_failures_total: u64,
    pub channel_dropped_total: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            uptime_secs = format!("{:.3}", self.uptime_secs),
            fares_computed = %self.fares_computed,
            fares_rejected = %self.fares_rejected,
            broadcasts = %self.broadcasts_total,
            deliveries = %self.deliveries_total,
            observer_failures = %self.observer_failures_total,
            channel_dropped = %self.channel_dropped_total,
            "metrics"
        );
    }
}
