//! Per-connection statistics.
//!
//! Counters are atomic so a snapshot can be taken through a shared
//! reference while the connection is in use.

use std::sync::atomic::{AtomicU64, Ordering};

/// Operation counters of one connection.
///
/// Values are monotonically increasing.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    // Operation counters
    /// Fetch calls that found a record.
    hits: AtomicU64,
    /// Fetch calls that found nothing.
    misses: AtomicU64,
    /// Successful stores.
    stores: AtomicU64,
    /// Successful appends.
    appends: AtomicU64,
    /// Successful deletes (record existed).
    deletes: AtomicU64,

    // Transaction counters
    /// Explicit transactions started.
    transactions_started: AtomicU64,
    /// Commits that succeeded, implicit or explicit.
    commits: AtomicU64,
    /// Commits that failed.
    failed_commits: AtomicU64,
    /// Rollbacks issued, explicit or after a failed commit.
    rollbacks: AtomicU64,

    // Bytes counters
    /// Value bytes read.
    bytes_read: AtomicU64,
    /// Value bytes written.
    bytes_written: AtomicU64,

    /// Engine calls that returned a failure code, in either call shape.
    errors: AtomicU64,
}

impl ConnectionStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_fetch(&self, bytes: Option<usize>) {
        match bytes {
            Some(len) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                self.bytes_read.fetch_add(len as u64, Ordering::Relaxed);
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub(crate) fn record_store(&self, bytes: usize) {
        self.stores.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_append(&self, bytes: usize) {
        self.appends.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transaction_start(&self) {
        self.transactions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commit(&self, succeeded: bool) {
        if succeeded {
            self.commits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_commits.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            appends: self.appends.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            transactions_started: self.transactions_started.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            failed_commits: self.failed_commits.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`ConnectionStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Fetch calls that found a record.
    pub hits: u64,
    /// Fetch calls that found nothing.
    pub misses: u64,
    /// Successful stores.
    pub stores: u64,
    /// Successful appends.
    pub appends: u64,
    /// Successful deletes.
    pub deletes: u64,
    /// Explicit transactions started.
    pub transactions_started: u64,
    /// Successful commits.
    pub commits: u64,
    /// Failed commits.
    pub failed_commits: u64,
    /// Rollbacks issued.
    pub rollbacks: u64,
    /// Value bytes read.
    pub bytes_read: u64,
    /// Value bytes written.
    pub bytes_written: u64,
    /// Engine calls that returned a failure code (`NotFound` excluded).
    pub errors: u64,
}
