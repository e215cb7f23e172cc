use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use {
    async_trait::async_trait,
    tokio::sync::{Mutex, mpsc},
    tokio_util::sync::CancellationToken,
    tracing::{debug, warn},
};

use crate::message::{InboundMessage, OutboundMessage};

/// Default bounded queue depth for each stream.
pub const DEFAULT_QUEUE_DEPTH: usize = 256;

/// Synchronous delivery target registered under a channel name.
///
/// The routing layer uses this to hand an outbound message straight to an
/// adapter without a trip through the outbound queue.
#[async_trait]
pub trait OutboundHandler: Send + Sync {
    async fn deliver(&self, msg: OutboundMessage) -> anyhow::Result<()>;
}

/// Registry and closed flag share one reader/writer lock; the queues are
/// mpsc channels and need no extra locking on the producer side.
struct Shared {
    closed: bool,
    inbound_tx: Option<mpsc::Sender<InboundMessage>>,
    outbound_tx: Option<mpsc::Sender<OutboundMessage>>,
    handlers: HashMap<String, Arc<dyn OutboundHandler>>,
}

/// In-process publish/subscribe hub carrying the inbound and outbound
/// message streams between adapters and the routing layer.
///
/// Publishing is non-blocking and best-effort: messages are dropped when a
/// queue is full or the bus has been closed. Consumers unblock promptly on
/// close or when their cancellation token fires.
pub struct Bus {
    shared: RwLock<Shared>,
    inbound_rx: Mutex<mpsc::Receiver<InboundMessage>>,
    outbound_rx: Mutex<mpsc::Receiver<OutboundMessage>>,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_DEPTH)
    }
}

impl Bus {
    #[must_use]
    pub fn new(queue_depth: usize) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(queue_depth.max(1));
        let (outbound_tx, outbound_rx) = mpsc::channel(queue_depth.max(1));
        Self {
            shared: RwLock::new(Shared {
                closed: false,
                inbound_tx: Some(inbound_tx),
                outbound_tx: Some(outbound_tx),
                handlers: HashMap::new(),
            }),
            inbound_rx: Mutex::new(inbound_rx),
            outbound_rx: Mutex::new(outbound_rx),
        }
    }

    /// Enqueue an inbound message. Never blocks; drops after [`Bus::close`]
    /// or when the queue is full.
    pub fn publish_inbound(&self, msg: InboundMessage) {
        let tx = {
            let shared = self.shared.read().unwrap_or_else(|e| e.into_inner());
            if shared.closed {
                debug!(channel = %msg.channel, "inbound publish after close, dropping");
                return;
            }
            shared.inbound_tx.clone()
        };
        if let Some(tx) = tx
            && let Err(e) = tx.try_send(msg)
        {
            warn!(error = %e, "inbound queue full, dropping message");
        }
    }

    /// Enqueue an outbound message. Same best-effort contract as
    /// [`Bus::publish_inbound`].
    pub fn publish_outbound(&self, msg: OutboundMessage) {
        let tx = {
            let shared = self.shared.read().unwrap_or_else(|e| e.into_inner());
            if shared.closed {
                debug!(channel = %msg.channel, "outbound publish after close, dropping");
                return;
            }
            shared.outbound_tx.clone()
        };
        if let Some(tx) = tx
            && let Err(e) = tx.try_send(msg)
        {
            warn!(error = %e, "outbound queue full, dropping message");
        }
    }

    /// Dequeue the next inbound message. Returns `None` once the token is
    /// cancelled or the bus has been closed and drained.
    pub async fn consume_inbound(&self, cancel: &CancellationToken) -> Option<InboundMessage> {
        let mut rx = self.inbound_rx.lock().await;
        tokio::select! {
            () = cancel.cancelled() => None,
            msg = rx.recv() => msg,
        }
    }

    /// Dequeue the next outbound message. Competing consumers each receive
    /// a disjoint subset of the stream.
    pub async fn subscribe_outbound(&self, cancel: &CancellationToken) -> Option<OutboundMessage> {
        let mut rx = self.outbound_rx.lock().await;
        tokio::select! {
            () = cancel.cancelled() => None,
            msg = rx.recv() => msg,
        }
    }

    /// Register a synchronous delivery target under a channel name,
    /// replacing any previous registration for that name.
    pub fn register_handler(&self, channel: impl Into<String>, handler: Arc<dyn OutboundHandler>) {
        let mut shared = self.shared.write().unwrap_or_else(|e| e.into_inner());
        shared.handlers.insert(channel.into(), handler);
    }

    /// Look up the handler registered under `channel`.
    #[must_use]
    pub fn handler(&self, channel: &str) -> Option<Arc<dyn OutboundHandler>> {
        let shared = self.shared.read().unwrap_or_else(|e| e.into_inner());
        shared.handlers.get(channel).cloned()
    }

    /// Mark the bus closed and release both queues so blocked consumers
    /// unblock. Idempotent.
    pub fn close(&self) {
        let mut shared = self.shared.write().unwrap_or_else(|e| e.into_inner());
        if shared.closed {
            return;
        }
        shared.closed = true;
        shared.inbound_tx = None;
        shared.outbound_tx = None;
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        let shared = self.shared.read().unwrap_or_else(|e| e.into_inner());
        shared.closed
    }

    /// Drain the outbound stream and route each message to the handler
    /// registered under its channel name. Messages for unregistered
    /// channels are logged and dropped. Runs until cancellation or close.
    pub async fn dispatch_outbound(&self, cancel: &CancellationToken) {
        while let Some(msg) = self.subscribe_outbound(cancel).await {
            let Some(handler) = self.handler(&msg.channel) else {
                warn!(channel = %msg.channel, "no handler for outbound channel, dropping");
                continue;
            };
            let channel = msg.channel.clone();
            let chat_id = msg.chat_id.clone();
            if let Err(e) = handler.deliver(msg).await {
                warn!(channel, chat_id, error = %e, "outbound delivery failed");
            }
        }
        debug!("outbound dispatch loop stopped");
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;

    struct CountingHandler {
        delivered: AtomicUsize,
    }

    #[async_trait]
    impl OutboundHandler for CountingHandler {
        async fn deliver(&self, _msg: OutboundMessage) -> anyhow::Result<()> {
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn inbound(content: &str) -> InboundMessage {
        InboundMessage::new("test", "sender", "chat", content)
    }

    #[tokio::test]
    async fn publish_then_consume_round_trips() {
        let bus = Bus::default();
        bus.publish_inbound(inbound("hello"));
        let cancel = CancellationToken::new();
        let msg = bus.consume_inbound(&cancel).await.expect("message");
        assert_eq!(msg.content, "hello");
    }

    #[tokio::test]
    async fn publish_after_close_is_silent_noop() {
        let bus = Bus::default();
        bus.close();
        // Must neither panic nor block.
        bus.publish_inbound(inbound("dropped"));
        bus.publish_outbound(OutboundMessage::new("test", "chat", "dropped"));
        assert!(bus.is_closed());
    }

    #[tokio::test]
    async fn close_is_idempotent_and_unblocks_consumers() {
        let bus = Arc::new(Bus::default());
        bus.close();
        bus.close();
        let cancel = CancellationToken::new();
        let got = tokio::time::timeout(Duration::from_secs(1), bus.consume_inbound(&cancel))
            .await
            .expect("consumer must unblock after close");
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn consume_on_cancelled_token_returns_none_promptly() {
        let bus = Bus::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let got = tokio::time::timeout(Duration::from_millis(100), bus.consume_inbound(&cancel))
            .await
            .expect("cancelled consume must return promptly");
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let bus = Bus::new(1);
        bus.publish_inbound(inbound("first"));
        // Queue depth is 1; this publish is dropped, not blocked on.
        bus.publish_inbound(inbound("second"));
        let cancel = CancellationToken::new();
        let first = bus.consume_inbound(&cancel).await.expect("first");
        assert_eq!(first.content, "first");
        cancel.cancel();
        assert!(bus.consume_inbound(&cancel).await.is_none());
    }

    #[tokio::test]
    async fn handler_registry_round_trips() {
        let bus = Bus::default();
        assert!(bus.handler("telegram").is_none());
        bus.register_handler(
            "telegram",
            Arc::new(CountingHandler {
                delivered: AtomicUsize::new(0),
            }),
        );
        assert!(bus.handler("telegram").is_some());
    }

    #[tokio::test]
    async fn dispatch_routes_by_channel_name() {
        let bus = Arc::new(Bus::default());
        let handler = Arc::new(CountingHandler {
            delivered: AtomicUsize::new(0),
        });
        bus.register_handler("tg", Arc::clone(&handler) as Arc<dyn OutboundHandler>);

        bus.publish_outbound(OutboundMessage::new("tg", "1", "a"));
        bus.publish_outbound(OutboundMessage::new("unknown", "1", "b"));
        bus.publish_outbound(OutboundMessage::new("tg", "2", "c"));

        let cancel = CancellationToken::new();
        let dispatch_bus = Arc::clone(&bus);
        let dispatch_cancel = cancel.clone();
        let task =
            tokio::spawn(async move { dispatch_bus.dispatch_outbound(&dispatch_cancel).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        task.await.expect("dispatch task");

        assert_eq!(handler.delivered.load(Ordering::SeqCst), 2);
    }
}
