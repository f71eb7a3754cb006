// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Output statistics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Statistics for an output router.
#[derive(Debug)]
pub struct OutputStats {
    /// Records handed to the router.
    pub records_received: AtomicU64,

    /// Records published.
    pub records_published: AtomicU64,

    /// Records skipped because no routing key could be built.
    pub records_skipped: AtomicU64,

    /// Publish failures.
    pub publish_errors: AtomicU64,

    /// Body bytes published.
    pub bytes_published: AtomicU64,

    /// Router creation time.
    pub created: Instant,
}

impl Default for OutputStats {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputStats {
    /// Create new stats.
    pub fn new() -> Self {
        Self {
            records_received: AtomicU64::new(0),
            records_published: AtomicU64::new(0),
            records_skipped: AtomicU64::new(0),
            publish_errors: AtomicU64::new(0),
            bytes_published: AtomicU64::new(0),
            created: Instant::now(),
        }
    }

    pub(crate) fn record_received(&self) {
        self.records_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_published(&self, bytes: u64) {
        self.records_published.fetch_add(1, Ordering::Relaxed);
        self.bytes_published.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped(&self) {
        self.records_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_publish_error(&self) {
        self.publish_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of current stats.
    pub fn snapshot(&self) -> OutputStatsSnapshot {
        OutputStatsSnapshot {
            records_received: self.records_received.load(Ordering::Relaxed),
            records_published: self.records_published.load(Ordering::Relaxed),
            records_skipped: self.records_skipped.load(Ordering::Relaxed),
            publish_errors: self.publish_errors.load(Ordering::Relaxed),
            bytes_published: self.bytes_published.load(Ordering::Relaxed),
            uptime_secs: self.created.elapsed().as_secs(),
        }
    }
}

/// Snapshot of output statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputStatsSnapshot {
    pub records_received: u64,
    pub records_published: u64,
    pub records_skipped: u64,
    pub publish_errors: u64,
    pub bytes_published: u64,
    pub uptime_secs: u64,
}

impl OutputStatsSnapshot {
    /// Calculate published records per second.
    pub fn records_per_second(&self) -> f64 {
        if self.uptime_secs > 0 {
            self.records_published as f64 / self.uptime_secs as f64
        } else {
            0.0
        }
    }

    /// Fraction of received records that were skipped.
    pub fn skip_ratio(&self) -> f64 {
        if self.records_received > 0 {
            self.records_skipped as f64 / self.records_received as f64
        } else {
            0.0
        }
    }
}
