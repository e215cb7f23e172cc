use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Well-known inbound metadata keys.
///
/// Adapters are free to add platform-specific keys beyond these; the routing
/// layer must treat unknown keys as opaque.
pub mod meta {
    /// Conversation kind: `direct`, `group`, `thread` or `channel`.
    pub const PEER_KIND: &str = "peer_kind";
    /// Platform-scoped peer identity (group id for group chats).
    pub const PEER_ID: &str = "peer_id";
    /// Platform message id of the inbound event.
    pub const MESSAGE_ID: &str = "message_id";
    /// Platform message id this message replies to.
    pub const REPLY_TO: &str = "reply_to";
    /// Display name of the sender when the platform reports one.
    pub const SENDER_NAME: &str = "sender_name";
}

/// Canonical inbound message: produced by an adapter, consumed by the
/// routing layer. Immutable value once published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Adapter identity string (e.g. "telegram", "wecom").
    pub channel: String,
    /// Platform-scoped sender identity, opaque to the framework.
    pub sender_id: String,
    /// Platform-scoped conversation identity; may encode a composite key
    /// such as `"<chat>:<thread>"`.
    pub chat_id: String,
    /// Message text, markup- and mention-stripped by the adapter.
    pub content: String,
    /// Local file paths or URLs for attachments, in arrival order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<String>,
    /// Routing key assigned by the routing layer, never by the adapter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
    /// Platform-specific auxiliary facts (see [`meta`]).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl InboundMessage {
    /// Build an inbound message with no media and empty metadata.
    pub fn new(
        channel: impl Into<String>,
        sender_id: impl Into<String>,
        chat_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            sender_id: sender_id.into(),
            chat_id: chat_id.into(),
            content: content.into(),
            media: Vec::new(),
            session_key: None,
            metadata: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_media(mut self, media: Vec<String>) -> Self {
        self.media = media;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Canonical outbound message: produced by the routing layer, consumed by
/// the adapter named in `channel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Target adapter identity.
    pub channel: String,
    /// Conversation identity in the owning adapter's composite grammar.
    pub chat_id: String,
    /// Message text in the bus's lightweight markup.
    pub content: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl OutboundMessage {
    pub fn new(
        channel: impl Into<String>,
        chat_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            chat_id: chat_id.into(),
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }
}
