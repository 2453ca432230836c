//! Counters for registry operations.
//!
//! A root container owns a [`Metrics`] instance; children share it, forks get
//! their own.
//!
//! ```ignore
//! let root = Container::new();
//! root.register_value("flag", true);
//! root.resolve("flag");
//!
//! let snapshot = root.metrics().snapshot();
//! assert_eq!(snapshot.registrations, 1);
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters.
#[derive(Default, Debug)]
pub struct Metrics {
    /// Registrations (values, factories and classes)
    pub registrations: AtomicU64,
    /// Synchronous resolutions that found a value
    pub resolutions: AtomicU64,
    /// Synchronous resolutions that found nothing
    pub misses: AtomicU64,
    /// Async resolutions that had to wait
    pub async_waits: AtomicU64,
    /// Async resolutions completed with a value
    pub async_resolved: AtomicU64,
    /// Async resolutions failed by their cancel signal
    pub async_cancelled: AtomicU64,
    /// Containers forked
    pub forks: AtomicU64,
}

impl Metrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a registration.
    pub fn record_registration(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a synchronous resolution.
    pub fn record_resolution(&self, found: bool) {
        if found {
            self.resolutions.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record an async resolution that suspended.
    pub fn record_async_wait(&self) {
        self.async_waits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an async resolution that completed with a value.
    pub fn record_async_resolved(&self) {
        self.async_resolved.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an async resolution that was cancelled.
    pub fn record_async_cancelled(&self) {
        self.async_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a fork.
    pub fn record_fork(&self) {
        self.forks.fetch_add(1, Ordering::Relaxed);
    }

    /// Async resolutions still suspended.
    pub fn pending_waits(&self) -> u64 {
        let waits = self.async_waits.load(Ordering::Relaxed);
        let settled = self.async_resolved.load(Ordering::Relaxed)
            + self.async_cancelled.load(Ordering::Relaxed);
        waits.saturating_sub(settled)
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            registrations: self.registrations.load(Ordering::Relaxed),
            resolutions: self.resolutions.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            async_waits: self.async_waits.load(Ordering::Relaxed),
            async_resolved: self.async_resolved.load(Ordering::Relaxed),
            async_cancelled: self.async_cancelled.load(Ordering::Relaxed),
            forks: self.forks.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.registrations.store(0, Ordering::Relaxed);
        self.resolutions.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.async_waits.store(0, Ordering::Relaxed);
        self.async_resolved.store(0, Ordering::Relaxed);
        self.async_cancelled.store(0, Ordering::Relaxed);
        self.forks.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time metrics snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub registrations: u64,
    pub resolutions: u64,
    pub misses: u64,
    pub async_waits: u64,
    pub async_resolved: u64,
    pub async_cancelled: u64,
    pub forks: u64,
}
