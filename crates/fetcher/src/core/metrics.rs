//! Counters for a fetch batch
//!
//! Updated concurrently by every task through atomics.

use std::sync::atomic::{AtomicU64, Ordering};

use super::{Outcome, Stage};

/// Live counters for fetch operations
#[derive(Debug, Default)]
pub struct FetchMetrics {
    pub items_started: AtomicU64,
    pub primary_attempts: AtomicU64,
    pub fallback_attempts: AtomicU64,
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
    pub missing: AtomicU64,
    pub cancelled: AtomicU64,
    pub validation_failures: AtomicU64,
    pub total_bytes: AtomicU64,
}

impl FetchMetrics {
    pub fn record_started(&self) {
        self.items_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a network attempt against one of an item's locations
    pub fn record_attempt(&self, stage: Stage) {
        let counter = match stage {
            Stage::Primary => &self.primary_attempts,
            Stage::Fallback => &self.fallback_attempts,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bytes(&self, bytes: u64) {
        self.total_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_validation_failed(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the final outcome of an item
    pub fn record_outcome(&self, outcome: &Outcome) {
        let counter = match outcome {
            Outcome::Succeeded { .. } => &self.succeeded,
            Outcome::Failed { .. } => &self.failed,
            Outcome::MissingSource => &self.missing,
            Outcome::Cancelled => &self.cancelled,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> FetchMetricsSnapshot {
        FetchMetricsSnapshot {
            items_started: self.items_started.load(Ordering::Relaxed),
            primary_attempts: self.primary_attempts.load(Ordering::Relaxed),
            fallback_attempts: self.fallback_attempts.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            missing: self.missing.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            total_bytes: self.total_bytes.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of `FetchMetrics`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchMetricsSnapshot {
    pub items_started: u64,
    pub primary_attempts: u64,
    pub fallback_attempts: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub missing: u64,
    pub cancelled: u64,
    pub validation_failures: u64,
    pub total_bytes: u64,
}

impl FetchMetricsSnapshot {
    /// Items that reached any terminal outcome
    pub fn completed(&self) -> u64 {
        self.succeeded + self.failed + self.missing + self.cancelled
    }

    /// Calculate success rate as a fraction (0.0 to 1.0)
    pub fn success_rate(&self) -> f64 {
        let completed = self.completed();
        if completed == 0 {
            0.0
        } else {
            self.succeeded as f64 / completed as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FetchError;
    use std::path::PathBuf;

    #[test]
    fn outcomes_land_in_their_counters() {
        let metrics = FetchMetrics::default();
        metrics.record_outcome(&Outcome::Succeeded {
            written_path: PathBuf::from("a.pdf"),
        });
        metrics.record_outcome(&Outcome::MissingSource);
        metrics.record_outcome(&Outcome::Cancelled);
        metrics.record_outcome(&Outcome::failed(FetchError::NoLocation { stage: Stage::Fallback }));
        metrics.record_attempt(Stage::Primary);
        metrics.record_attempt(Stage::Fallback);
        metrics.record_bytes(42);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.completed(), 4);
        assert_eq!(snapshot.primary_attempts, 1);
        assert_eq!(snapshot.fallback_attempts, 1);
        assert_eq!(snapshot.total_bytes, 42);
        assert!((snapshot.success_rate() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_snapshot_has_zero_rate() {
        assert_eq!(FetchMetricsSnapshot::default().success_rate(), 0.0);
    }
}
