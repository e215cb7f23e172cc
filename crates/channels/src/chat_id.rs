use {estuary_common::types::ChatType, std::str::FromStr};

use crate::error::{Error, Result};

/// Composite conversation key in the `"<chat>"` or `"<chat>:<thread>"`
/// grammar used by thread-capable platforms.
///
/// A bare chat id means "no thread" (thread 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompositeChatId {
    pub chat: i64,
    pub thread: i64,
}

impl CompositeChatId {
    #[must_use]
    pub fn new(chat: i64, thread: i64) -> Self {
        Self { chat, thread }
    }

    #[must_use]
    pub fn has_thread(&self) -> bool {
        self.thread != 0
    }
}

impl FromStr for CompositeChatId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((chat, thread)) => Ok(Self {
                chat: chat.parse()?,
                thread: thread.parse()?,
            }),
            None => Ok(Self {
                chat: s.parse()?,
                thread: 0,
            }),
        }
    }
}

impl std::fmt::Display for CompositeChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.thread == 0 {
            write!(f, "{}", self.chat)
        } else {
            write!(f, "{}:{}", self.chat, self.thread)
        }
    }
}

/// Parse a chat id in the `"<kind>:<id>"` scope grammar used by adapters
/// whose peer ids are strings (e.g. `"group:oc_abc123"`). A bare id is a
/// direct conversation.
pub fn parse_scoped(chat_id: &str) -> Result<(ChatType, &str)> {
    match chat_id.split_once(':') {
        Some(("group", id)) => Ok((ChatType::Group, id)),
        Some(("channel", id)) => Ok((ChatType::Channel, id)),
        Some(("direct", id)) => Ok((ChatType::Direct, id)),
        Some((kind, _)) => Err(Error::invalid_input(format!("unknown chat scope: {kind}"))),
        None if chat_id.is_empty() => Err(Error::invalid_input("empty chat id")),
        None => Ok((ChatType::Direct, chat_id)),
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("-1001234567:5", -1_001_234_567, 5)]
    #[case("12345", 12_345, 0)]
    #[case("42:0", 42, 0)]
    fn composite_parses(#[case] input: &str, #[case] chat: i64, #[case] thread: i64) {
        let id: CompositeChatId = input.parse().unwrap();
        assert_eq!(id.chat, chat);
        assert_eq!(id.thread, thread);
    }

    #[rstest]
    #[case("invalid")]
    #[case("123:invalid")]
    #[case("")]
    #[case(":5")]
    fn composite_rejects_garbage(#[case] input: &str) {
        assert!(input.parse::<CompositeChatId>().is_err());
    }

    #[test]
    fn composite_display_round_trips() {
        let id = CompositeChatId::new(-1_001_234_567, 5);
        assert_eq!(id.to_string(), "-1001234567:5");
        assert_eq!(id.to_string().parse::<CompositeChatId>().unwrap(), id);

        let bare = CompositeChatId::new(12_345, 0);
        assert_eq!(bare.to_string(), "12345");
        assert!(!bare.has_thread());
    }

    #[test]
    fn scoped_parses_group_and_bare() {
        assert_eq!(
            parse_scoped("group:oc_abc").unwrap(),
            (ChatType::Group, "oc_abc")
        );
        assert_eq!(parse_scoped("u123").unwrap(), (ChatType::Direct, "u123"));
        assert!(parse_scoped("room:x").is_err());
        assert!(parse_scoped("").is_err());
    }
}
