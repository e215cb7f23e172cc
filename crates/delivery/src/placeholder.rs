//! Track placeholder messages awaiting replacement.
//!
//! When an adapter posts a provisional "thinking" message it records the
//! platform message id here, keyed by chat. The pipeline consumes the
//! entry exactly once and edits that message in place instead of sending
//! a new one.

use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct PlaceholderMap {
    inner: DashMap<String, String>,
}

impl PlaceholderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the platform message id of a placeholder for `chat_id`.
    /// A second placeholder for the same chat replaces the first.
    pub fn set(&self, chat_id: impl Into<String>, message_id: impl Into<String>) {
        self.inner.insert(chat_id.into(), message_id.into());
    }

    /// Consume the placeholder for `chat_id`, if one is pending.
    pub fn take(&self, chat_id: &str) -> Option<String> {
        self.inner.remove(chat_id).map(|(_, id)| id)
    }

    /// Drop a pending placeholder without consuming it, e.g. when the
    /// placeholder message was deleted on the platform side.
    pub fn discard(&self, chat_id: &str) {
        self.inner.remove(chat_id);
    }
}
