use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use tracing::{debug, info};

use estuary_bus::{Bus, InboundMessage};

use crate::gating;

/// Placeholder published instead of an empty body so the "content is never
/// empty" bus invariant holds even for media-only or sticker-only events.
pub const EMPTY_MESSAGE_PLACEHOLDER: &str = "[empty message]";

/// Shared fields every adapter needs: channel name, bus handle, running
/// flag and sender allowlist, plus the single funnel through which an
/// adapter may inject inbound data into the bus.
pub struct ChannelCore {
    name: String,
    bus: Arc<Bus>,
    running: AtomicBool,
    allowlist: Vec<String>,
}

impl ChannelCore {
    #[must_use]
    pub fn new(name: impl Into<String>, bus: Arc<Bus>, allowlist: Vec<String>) -> Self {
        Self {
            name: name.into(),
            bus,
            running: AtomicBool::new(false),
            allowlist,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<Bus> {
        &self.bus
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    /// Whether `sender_id` may interact with this adapter. Adapters must
    /// check this before any expensive work (media download, transcription)
    /// so unauthenticated senders cannot burn I/O.
    #[must_use]
    pub fn is_allowed(&self, sender_id: &str) -> bool {
        gating::is_allowed(sender_id, &self.allowlist)
    }

    /// Assemble and publish the canonical inbound message. This is the only
    /// path by which an adapter injects data into the bus.
    ///
    /// Empty content is replaced by [`EMPTY_MESSAGE_PLACEHOLDER`] so the
    /// canonical invariant (channel/sender/chat/content never empty) holds.
    pub fn handle_message(
        &self,
        sender_id: &str,
        chat_id: &str,
        content: &str,
        media: Vec<String>,
        metadata: BTreeMap<String, String>,
    ) {
        if sender_id.is_empty() || chat_id.is_empty() {
            debug!(
                channel = %self.name,
                "dropping inbound event without sender or chat identity"
            );
            return;
        }
        let content = if content.trim().is_empty() {
            EMPTY_MESSAGE_PLACEHOLDER
        } else {
            content
        };

        info!(
            channel = %self.name,
            sender_id,
            chat_id,
            content_len = content.len(),
            media_count = media.len(),
            "inbound message"
        );

        self.bus.publish_inbound(
            InboundMessage::new(&self.name, sender_id, chat_id, content)
                .with_media(media)
                .with_metadata(metadata),
        );
    }
}
