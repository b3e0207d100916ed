//! Graceful-shutdown tracking for in-flight asynchronous deliveries
//!
//! Each queued delivery registers a token; the registry can then block
//! until every token has been dropped or a deadline passes. Tokens carry an
//! optional per-transport wait bound that caps how long process exit will
//! wait for them.

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long shutdown waits for pending deliveries when no explicit bound
/// is configured anywhere.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

struct Inner {
    pending: Mutex<HashMap<u64, Option<Duration>>>,
    cond: Condvar,
    seq: AtomicU64,
}

/// Shared registry of in-flight deliveries.
#[derive(Clone)]
pub struct ShutdownRegistry {
    inner: Arc<Inner>,
}

impl Default for ShutdownRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                pending: Mutex::new(HashMap::new()),
                cond: Condvar::new(),
                seq: AtomicU64::new(1),
            }),
        }
    }

    /// Register one in-flight delivery. The returned token must be dropped
    /// when the delivery settles, success or failure.
    pub fn register(&self, max_wait: Option<Duration>) -> DrainToken {
        let id = self.inner.seq.fetch_add(1, Ordering::Relaxed);
        self.inner.pending.lock().insert(id, max_wait);
        DrainToken {
            registry: self.inner.clone(),
            id,
        }
    }

    pub fn pending(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Block until no deliveries are pending.
    ///
    /// The wait is bounded by `bound` when given, otherwise by the largest
    /// per-token bound among the pending tokens; with neither,
    /// [`DEFAULT_SHUTDOWN_TIMEOUT`] applies. The wait is always finite so
    /// shutdown can never hang on a stuck delivery. Returns `true` when the
    /// registry drained, `false` on timeout.
    pub fn wait_idle(&self, bound: Option<Duration>) -> bool {
        let mut pending = self.inner.pending.lock();
        if pending.is_empty() {
            return true;
        }

        let limit = bound
            .or_else(|| pending.values().filter_map(|w| *w).max())
            .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);

        let deadline = Instant::now() + limit;
        while !pending.is_empty() {
            if self.inner.cond.wait_until(&mut pending, deadline).timed_out() {
                return pending.is_empty();
            }
        }
        true
    }
}

/// RAII handle for one in-flight delivery.
pub struct DrainToken {
    registry: Arc<Inner>,
    id: u64,
}

impl Drop for DrainToken {
    fn drop(&mut self) {
        self.registry.pending.lock().remove(&self.id);
        self.registry.cond.notify_all();
    }
}
