use serde::{Deserialize, Serialize};

/// Kind of conversation an inbound message arrived from.
///
/// Serialized into inbound metadata under the `peer_kind` key, so the
/// routing layer can derive session keys without knowing the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatType {
    /// One-on-one conversation with the bot.
    Direct,
    /// Group chat.
    Group,
    /// Thread inside a group chat.
    Thread,
    /// Broadcast channel.
    Channel,
}

impl ChatType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Group => "group",
            Self::Thread => "thread",
            Self::Channel => "channel",
        }
    }
}

impl std::fmt::Display for ChatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChatType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(Self::Direct),
            "group" => Ok(Self::Group),
            "thread" => Ok(Self::Thread),
            "channel" => Ok(Self::Channel),
            other => Err(crate::Error::message(format!("unknown chat type: {other}"))),
        }
    }
}

/// A media attachment carried alongside a message: either a URL the platform
/// hosts or a local path the adapter downloaded to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRef {
    /// Local file path or remote URL.
    pub location: String,
    /// MIME type when the platform reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl MediaRef {
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            mime_type: None,
        }
    }

    #[must_use]
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }
}
