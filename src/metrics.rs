//! Counters for the fairness core

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub struct FairnessMetrics {
    start_time: Instant,
    rounds_evaluated: AtomicU64,
    pairs_created: AtomicU64,
    rotations: AtomicU64,
    rotation_failures: AtomicU64,
    verification_failures: AtomicU64,
}

impl Default for FairnessMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl FairnessMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            rounds_evaluated: AtomicU64::new(0),
            pairs_created: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
            rotation_failures: AtomicU64::new(0),
            verification_failures: AtomicU64::new(0),
        }
    }

    pub fn record_round(&self) {
        self.rounds_evaluated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pair_created(&self) {
        self.pairs_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rotation(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rotation_failure(&self) {
        self.rotation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_verification_failure(&self) {
        self.verification_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rounds_evaluated: self.rounds_evaluated.load(Ordering::Relaxed),
            pairs_created: self.pairs_created.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            rotation_failures: self.rotation_failures.load(Ordering::Relaxed),
            verification_failures: self.verification_failures.load(Ordering::Relaxed),
            uptime: self.start_time.elapsed(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub rounds_evaluated: u64,
    pub pairs_created: u64,
    pub rotations: u64,
    pub rotation_failures: u64,
    pub verification_failures: u64,
    pub uptime: Duration,
}

impl MetricsSnapshot {
    /// Rounds per second since startup
    pub fn average_rounds_per_sec(&self) -> f64 {
        let secs = self.uptime.as_secs_f64();
        if secs < 1.0 {
            return 0.0;
        }
        self.rounds_evaluated as f64 / secs
    }
}
