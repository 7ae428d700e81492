//! Token Accounting
//!
//! Per-provider running counters, fed by `Usage` events flowing through the
//! stage channels. Providers report cumulative totals (some repeat a
//! snapshot on every chunk, some send one at the end), so the tally keeps
//! the maximum observed value, so the counter never regresses within a
//! session, and a new session starts from a fresh tally at zero.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic token counter for one provider within one session.
#[derive(Debug, Default)]
pub struct TokenTally {
    total: AtomicU64,
}

impl TokenTally {
    /// Create a fresh tally at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cumulative total reported by the provider.
    pub fn observe_total(&self, total: u64) {
        self.total.fetch_max(total, Ordering::Relaxed);
    }

    /// Current total consumed tokens.
    pub fn get(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}
