use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use {dashmap::DashMap, tokio::sync::oneshot, tracing::debug};

/// Per-connection map from a pending request token to the single-slot
/// receiver waiting for its response.
///
/// Tokens are unique within the process (wall-clock millis plus a monotonic
/// counter), which is collision-free for the lifetime of one connection.
#[derive(Default)]
pub struct CorrelationTable {
    pending: DashMap<String, oneshot::Sender<serde_json::Value>>,
    counter: AtomicU64,
}

impl CorrelationTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate the next request token.
    #[must_use]
    pub fn next_token(&self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{millis}-{seq}")
    }

    /// Register a single-slot receiver under `token`.
    #[must_use]
    pub fn register(&self, token: &str) -> oneshot::Receiver<serde_json::Value> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(token.to_owned(), tx);
        rx
    }

    /// Route a response to the receiver registered under `token`.
    /// Returns `false` when no caller is waiting (already resolved, timed
    /// out, or never ours).
    pub fn resolve(&self, token: &str, response: serde_json::Value) -> bool {
        match self.pending.remove(token) {
            Some((_, tx)) => tx.send(response).is_ok(),
            None => false,
        }
    }

    /// Drop the receiver registered under `token`, if any. Used by callers
    /// abandoning a call after timeout so the table does not grow.
    pub fn forget(&self, token: &str) {
        self.pending.remove(token);
    }

    /// Force-complete every pending call with a closed-channel error by
    /// dropping its sender. Called on disconnect and on stop so no caller
    /// blocks past shutdown.
    pub fn fail_all(&self) {
        let count = self.pending.len();
        if count > 0 {
            debug!(pending = count, "failing all pending correlation entries");
        }
        self.pending.clear();
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
