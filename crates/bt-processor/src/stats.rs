//! Processor counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals, updated by every worker.
#[derive(Debug, Default)]
pub struct ProcessorStats {
    processed:        AtomicU64,
    dropped:          AtomicU64,
    store_errors:     AtomicU64,
    republish_errors: AtomicU64,
}

/// A point-in-time copy of [`ProcessorStats`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Messages that parsed and went through the store steps.
    pub processed:        u64,
    /// Malformed messages.
    pub dropped:          u64,
    pub store_errors:     u64,
    pub republish_errors: u64,
}

impl ProcessorStats {
    pub(crate) fn processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn republish_error(&self) {
        self.republish_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            processed:        self.processed.load(Ordering::Relaxed),
            dropped:          self.dropped.load(Ordering::Relaxed),
            store_errors:     self.store_errors.load(Ordering::Relaxed),
            republish_errors: self.republish_errors.load(Ordering::Relaxed),
        }
    }
}
