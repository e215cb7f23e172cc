//! Short-lived reply tokens granted by inbound webhook events.
//!
//! Some platforms hand out a one-shot token with each inbound event that
//! allows a free reply for a limited window. The store keeps at most one
//! token per chat, consumes it on first use, and treats expired tokens as
//! absent.

use std::time::{Duration, Instant};

use dashmap::DashMap;

pub const DEFAULT_REPLY_TOKEN_TTL: Duration = Duration::from_secs(50);

#[derive(Debug)]
pub struct ReplyTokenStore {
    tokens: DashMap<String, (String, Instant)>,
    ttl: Duration,
}

impl Default for ReplyTokenStore {
    fn default() -> Self {
        Self::new(DEFAULT_REPLY_TOKEN_TTL)
    }
}

impl ReplyTokenStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            tokens: DashMap::new(),
            ttl,
        }
    }

    /// Record the token granted by the latest inbound event for `chat_id`,
    /// replacing any earlier one.
    pub fn grant(&self, chat_id: impl Into<String>, token: impl Into<String>) {
        self.tokens
            .insert(chat_id.into(), (token.into(), Instant::now()));
    }

    /// Consume the token for `chat_id`. Returns `None` when no token is
    /// held or the window has elapsed; either way nothing remains stored.
    pub fn consume(&self, chat_id: &str) -> Option<String> {
        let (_, (token, granted_at)) = self.tokens.remove(chat_id)?;
        if granted_at.elapsed() > self.ttl {
            return None;
        }
        Some(token)
    }
}
