//! Outbound delivery pipeline.
//!
//! One message goes out as an ordered sequence of steps: consume a pending
//! placeholder, split into platform-sized chunks, render each chunk to
//! HTML, edit the placeholder with the first chunk, prefer a reply token
//! over the durable send path, retry a rejected rich send once as plain
//! text, and keep sending remaining chunks after a failure.

use {
    async_trait::async_trait,
    tracing::{debug, warn},
};

use crate::{
    chunk::split_chunks,
    markup::render_html,
    placeholder::PlaceholderMap,
    reply_token::ReplyTokenStore,
};

/// How the text argument of a send should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
    /// Text is platform HTML produced by the markup translator.
    Rich,
    /// Text is raw, unrendered content.
    Plain,
}

/// Platform-specific send operations an adapter implements.
#[async_trait]
pub trait PlatformSender: Send + Sync {
    /// Maximum message length in bytes accepted by the platform.
    fn message_limit(&self) -> usize;

    /// Send a new message; returns the platform message id.
    async fn send(&self, chat_id: &str, text: &str, mode: SendMode) -> anyhow::Result<String>;

    /// Edit an existing message in place.
    async fn edit(
        &self,
        chat_id: &str,
        message_id: &str,
        text: &str,
        mode: SendMode,
    ) -> anyhow::Result<()>;

    /// Send via a one-shot reply token. Platforms without reply tokens keep
    /// the default.
    async fn send_with_reply_token(
        &self,
        _chat_id: &str,
        _token: &str,
        _text: &str,
    ) -> anyhow::Result<String> {
        anyhow::bail!("reply tokens not supported")
    }
}

#[derive(Debug, Default)]
pub struct DeliveryPipeline {
    pub placeholders: PlaceholderMap,
    pub reply_tokens: ReplyTokenStore,
}

impl DeliveryPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `content` to `chat_id` through `sender`.
    ///
    /// Every chunk is attempted even when an earlier one fails; the last
    /// error is returned so one bad chunk does not swallow the rest of the
    /// message.
    pub async fn deliver(
        &self,
        sender: &dyn PlatformSender,
        chat_id: &str,
        content: &str,
    ) -> anyhow::Result<()> {
        let placeholder = self.placeholders.take(chat_id);
        let chunks = split_chunks(content, sender.message_limit());
        let mut last_err = None;

        for (index, chunk) in chunks.iter().enumerate() {
            let rendered = render_html(chunk);
            let result = if index == 0
                && let Some(message_id) = placeholder.as_deref()
            {
                self.edit_or_send(sender, chat_id, message_id, &rendered, chunk)
                    .await
            } else {
                self.send_chunk(sender, chat_id, &rendered, chunk).await
            };
            if let Err(err) = result {
                warn!(chat_id, chunk = index, error = %err, "chunk delivery failed");
                last_err = Some(err);
            }
        }

        match last_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// First chunk with a pending placeholder: edit it in place, and fall
    /// back to a fresh send when the edit is rejected (deleted message,
    /// identical content, expired edit window).
    async fn edit_or_send(
        &self,
        sender: &dyn PlatformSender,
        chat_id: &str,
        message_id: &str,
        rendered: &str,
        raw: &str,
    ) -> anyhow::Result<()> {
        match sender.edit(chat_id, message_id, rendered, SendMode::Rich).await {
            Ok(()) => Ok(()),
            Err(err) => {
                debug!(chat_id, message_id, error = %err, "placeholder edit failed, sending new message");
                self.send_chunk(sender, chat_id, rendered, raw).await
            }
        }
    }

    /// The reply token path is free on some platforms, so it is tried
    /// first; the durable send path remains the fallback. A rich send
    /// rejected by the platform is retried once as plain text with the
    /// unrendered chunk.
    async fn send_chunk(
        &self,
        sender: &dyn PlatformSender,
        chat_id: &str,
        rendered: &str,
        raw: &str,
    ) -> anyhow::Result<()> {
        if let Some(token) = self.reply_tokens.consume(chat_id) {
            match sender.send_with_reply_token(chat_id, &token, rendered).await {
                Ok(_) => return Ok(()),
                Err(err) => {
                    debug!(chat_id, error = %err, "reply token send failed, using durable path");
                }
            }
        }
        match sender.send(chat_id, rendered, SendMode::Rich).await {
            Ok(_) => Ok(()),
            Err(err) => {
                warn!(chat_id, error = %err, "rich send rejected, retrying as plain text");
                sender.send(chat_id, raw, SendMode::Plain).await.map(|_| ())
            }
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Op {
        Send(String, SendMode),
        Edit(String, String, SendMode),
        TokenSend(String, String),
    }

    #[derive(Default)]
    struct MockSender {
        ops: Mutex<Vec<Op>>,
        limit: usize,
        fail_edit: bool,
        fail_token: bool,
        /// Fail the first N rich sends.
        fail_rich: AtomicUsize,
        fail_plain: bool,
    }

    impl MockSender {
        fn new() -> Self {
            Self {
                limit: 4096,
                ..Self::default()
            }
        }

        fn ops(&self) -> Vec<Op> {
            self.ops.lock().unwrap().clone()
        }

        fn record(&self, op: Op) {
            self.ops.lock().unwrap().push(op);
        }
    }

    #[async_trait]
    impl PlatformSender for MockSender {
        fn message_limit(&self) -> usize {
            self.limit
        }

        async fn send(&self, _chat_id: &str, text: &str, mode: SendMode) -> anyhow::Result<String> {
            self.record(Op::Send(text.to_owned(), mode));
            match mode {
                SendMode::Rich if self.fail_rich.load(Ordering::SeqCst) > 0 => {
                    self.fail_rich.fetch_sub(1, Ordering::SeqCst);
                    anyhow::bail!("rich send rejected")
                }
                SendMode::Plain if self.fail_plain => anyhow::bail!("plain send rejected"),
                _ => Ok("new-msg".into()),
            }
        }

        async fn edit(
            &self,
            _chat_id: &str,
            message_id: &str,
            text: &str,
            mode: SendMode,
        ) -> anyhow::Result<()> {
            self.record(Op::Edit(message_id.to_owned(), text.to_owned(), mode));
            if self.fail_edit {
                anyhow::bail!("message to edit not found")
            }
            Ok(())
        }

        async fn send_with_reply_token(
            &self,
            _chat_id: &str,
            token: &str,
            text: &str,
        ) -> anyhow::Result<String> {
            self.record(Op::TokenSend(token.to_owned(), text.to_owned()));
            if self.fail_token {
                anyhow::bail!("reply token expired")
            }
            Ok("token-msg".into())
        }
    }

    #[tokio::test]
    async fn plain_message_sends_once() {
        let pipeline = DeliveryPipeline::new();
        let sender = MockSender::new();
        pipeline.deliver(&sender, "chat", "hello").await.unwrap();
        assert_eq!(sender.ops(), vec![Op::Send("hello".into(), SendMode::Rich)]);
    }

    #[tokio::test]
    async fn placeholder_is_edited_then_consumed() {
        let pipeline = DeliveryPipeline::new();
        pipeline.placeholders.set("chat", "ph-1");
        let sender = MockSender::new();

        pipeline.deliver(&sender, "chat", "done").await.unwrap();
        assert_eq!(
            sender.ops(),
            vec![Op::Edit("ph-1".into(), "done".into(), SendMode::Rich)]
        );

        // Second delivery must not see the placeholder again.
        pipeline.deliver(&sender, "chat", "more").await.unwrap();
        assert_eq!(sender.ops().len(), 2);
        assert_eq!(
            sender.ops()[1],
            Op::Send("more".into(), SendMode::Rich)
        );
    }

    #[tokio::test]
    async fn failed_edit_falls_back_to_send() {
        let pipeline = DeliveryPipeline::new();
        pipeline.placeholders.set("chat", "ph-1");
        let sender = MockSender {
            fail_edit: true,
            ..MockSender::new()
        };

        pipeline.deliver(&sender, "chat", "text").await.unwrap();
        assert_eq!(
            sender.ops(),
            vec![
                Op::Edit("ph-1".into(), "text".into(), SendMode::Rich),
                Op::Send("text".into(), SendMode::Rich),
            ]
        );
    }

    #[tokio::test]
    async fn rejected_rich_send_retries_plain_with_raw_text() {
        let pipeline = DeliveryPipeline::new();
        let sender = MockSender::new();
        sender.fail_rich.store(1, Ordering::SeqCst);

        pipeline.deliver(&sender, "chat", "**bold**").await.unwrap();
        assert_eq!(
            sender.ops(),
            vec![
                Op::Send("<b>bold</b>".into(), SendMode::Rich),
                Op::Send("**bold**".into(), SendMode::Plain),
            ]
        );
    }

    #[tokio::test]
    async fn reply_token_is_preferred_and_consumed_once() {
        let pipeline = DeliveryPipeline::new();
        pipeline.reply_tokens.grant("chat", "tok");
        let sender = MockSender::new();

        pipeline.deliver(&sender, "chat", "first").await.unwrap();
        pipeline.deliver(&sender, "chat", "second").await.unwrap();
        assert_eq!(
            sender.ops(),
            vec![
                Op::TokenSend("tok".into(), "first".into()),
                Op::Send("second".into(), SendMode::Rich),
            ]
        );
    }

    #[tokio::test]
    async fn failed_token_send_falls_back_to_durable_path() {
        let pipeline = DeliveryPipeline::new();
        pipeline.reply_tokens.grant("chat", "tok");
        let sender = MockSender {
            fail_token: true,
            ..MockSender::new()
        };

        pipeline.deliver(&sender, "chat", "msg").await.unwrap();
        assert_eq!(
            sender.ops(),
            vec![
                Op::TokenSend("tok".into(), "msg".into()),
                Op::Send("msg".into(), SendMode::Rich),
            ]
        );
    }

    #[tokio::test]
    async fn remaining_chunks_sent_after_mid_message_failure() {
        let pipeline = DeliveryPipeline::new();
        let sender = MockSender {
            limit: 16,
            fail_plain: true,
            ..MockSender::new()
        };
        // First rich send fails, its plain retry fails too, later chunks
        // still go out.
        sender.fail_rich.store(1, Ordering::SeqCst);

        let content = "aaaa\nbbbb\ncccc\ndddd\neeee\nffff";
        let err = pipeline
            .deliver(&sender, "chat", content)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "plain send rejected");

        let rich_sends = sender
            .ops()
            .iter()
            .filter(|op| matches!(op, Op::Send(_, SendMode::Rich)))
            .count();
        assert!(rich_sends >= 2, "later chunks were not attempted");
    }

    #[tokio::test]
    async fn long_message_is_chunked() {
        let pipeline = DeliveryPipeline::new();
        let sender = MockSender {
            limit: 16,
            ..MockSender::new()
        };
        pipeline
            .deliver(&sender, "chat", "aaaa\nbbbb\ncccc\ndddd")
            .await
            .unwrap();
        assert!(sender.ops().len() > 1);
    }
}
