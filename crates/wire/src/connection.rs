use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    futures::{SinkExt, StreamExt, stream::SplitSink},
    serde_json::Value,
    tokio::net::TcpStream,
    tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    correlation::CorrelationTable,
    error::{Error, Result},
};

/// Reconnect attempts are never scheduled closer together than this,
/// whatever the configuration says.
pub const MIN_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Connection settings for one duplex endpoint.
#[derive(Debug, Clone)]
pub struct WireConfig {
    pub url: String,
    /// Delay between reconnect attempts; clamped to
    /// [`MIN_RECONNECT_INTERVAL`].
    pub reconnect_interval: Duration,
    /// Cadence of the liveness probe, independent of the read loop.
    pub keepalive_interval: Duration,
    /// Default deadline for [`DuplexConnection::call`].
    pub call_timeout: Duration,
}

impl WireConfig {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_interval: MIN_RECONNECT_INTERVAL,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// The configured reconnect interval, clamped to the framework minimum.
    #[must_use]
    pub fn reconnect_every(&self) -> Duration {
        self.reconnect_interval.max(MIN_RECONNECT_INTERVAL)
    }
}

/// Receives unsolicited platform events from the read loop. Implementations
/// should hand work off quickly (e.g. publish to the bus); the read loop
/// awaits dispatch, not downstream completion.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_event(&self, event: Value);
}

/// One long-lived duplex websocket shared by API calls and event delivery.
///
/// State machine: Disconnected → Connecting → Listening → (read error or
/// probe failure) → Disconnected, with the reconnect loop re-establishing
/// while the owning token is live. The write path is serialized by the
/// writer mutex so two sends never interleave on the socket; the read loop
/// runs independently.
pub struct DuplexConnection {
    config: WireConfig,
    writer: tokio::sync::Mutex<Option<WsSink>>,
    table: CorrelationTable,
    handler: Arc<dyn EventHandler>,
    cancel: CancellationToken,
}

impl DuplexConnection {
    /// Build a connection owned by `cancel` (usually a child of the
    /// process shutdown token). No I/O happens until [`Self::start`].
    #[must_use]
    pub fn new(
        config: WireConfig,
        handler: Arc<dyn EventHandler>,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            writer: tokio::sync::Mutex::new(None),
            table: CorrelationTable::new(),
            handler,
            cancel,
        })
    }

    /// Spawn the background connect/listen/reconnect loop.
    pub fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let conn = Arc::clone(self);
        tokio::spawn(async move { conn.run().await })
    }

    /// Stop the connection: cancel the loop, close the socket and fail all
    /// pending calls so no caller blocks past shutdown.
    pub async fn stop(&self) {
        self.cancel.cancel();
        self.teardown().await;
    }

    #[must_use]
    pub async fn is_connected(&self) -> bool {
        self.writer.lock().await.is_some()
    }

    /// Issue an API call over the shared socket and wait for the response
    /// carrying the same correlation token.
    ///
    /// Returns the raw response value; callers expecting one of several
    /// response shapes decode with [`crate::reply::IdentityReply`] or an
    /// equivalent untagged enum whose variant order is the decode
    /// priority.
    pub async fn call(&self, action: &str, params: Value, timeout: Duration) -> Result<Value> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let token = self.table.next_token();
        let rx = self.table.register(&token);

        let request = serde_json::json!({
            "action": action,
            "params": params,
            "echo": token,
        });
        let text = serde_json::to_string(&request)?;
        if let Err(e) = self.send_raw(Message::Text(text.into())).await {
            self.table.forget(&token);
            return Err(e);
        }

        tokio::select! {
            () = self.cancel.cancelled() => {
                self.table.forget(&token);
                Err(Error::Cancelled)
            },
            outcome = tokio::time::timeout(timeout, rx) => match outcome {
                Ok(Ok(response)) => Ok(response),
                // Sender dropped: fail_all ran during disconnect or stop.
                Ok(Err(_)) => Err(Error::Cancelled),
                Err(_) => {
                    self.table.forget(&token);
                    Err(Error::Timeout { action: action.to_owned() })
                },
            },
        }
    }

    /// Send a frame through the shared writer. On write failure the sink is
    /// cleared under its lock so concurrent senders observe "not connected"
    /// instead of writing to a dead socket.
    async fn send_raw(&self, msg: Message) -> Result<()> {
        let mut writer = self.writer.lock().await;
        let Some(sink) = writer.as_mut() else {
            return Err(Error::NotConnected);
        };
        if let Err(e) = sink.send(msg).await {
            *writer = None;
            return Err(Error::WebSocket(e));
        }
        Ok(())
    }

    async fn run(self: Arc<Self>) {
        let reconnect_every = self.config.reconnect_every();

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            match connect_async(self.config.url.as_str()).await {
                Ok((ws, _response)) => {
                    info!(url = %self.config.url, "duplex connection established");
                    let (sink, stream) = ws.split();
                    *self.writer.lock().await = Some(sink);
                    self.listen(stream).await;
                    self.teardown().await;
                },
                Err(e) => {
                    if !self.cancel.is_cancelled() {
                        warn!(url = %self.config.url, error = %e, "connect failed");
                    }
                },
            }

            tokio::select! {
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(reconnect_every) => {},
            }
        }

        self.teardown().await;
        debug!(url = %self.config.url, "duplex connection loop stopped");
    }

    /// Read frames until cancellation, a read error, or a failed keepalive
    /// probe; all three take the same exit path back to the reconnect loop.
    async fn listen(
        &self,
        mut stream: impl StreamExt<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>
        + Unpin,
    ) {
        let mut keepalive = tokio::time::interval(self.config.keepalive_interval);
        // The first tick completes immediately; consume it so the probe
        // cadence starts one full interval after connect.
        keepalive.tick().await;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => return,
                _ = keepalive.tick() => {
                    if let Err(e) = self.send_raw(Message::Ping(Vec::new().into())).await {
                        if !self.cancel.is_cancelled() {
                            warn!(error = %e, "keepalive probe failed, reconnecting");
                        }
                        return;
                    }
                },
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.route_frame(text.as_str()).await,
                    Some(Ok(Message::Ping(data))) => {
                        let _ = self.send_raw(Message::Pong(data)).await;
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        if !self.cancel.is_cancelled() {
                            warn!(url = %self.config.url, "connection closed by peer");
                        }
                        return;
                    },
                    Some(Ok(_)) => {},
                    Some(Err(e)) => {
                        if !self.cancel.is_cancelled() {
                            warn!(error = %e, "read error, reconnecting");
                        }
                        return;
                    },
                },
            }
        }
    }

    async fn route_frame(&self, text: &str) {
        let frame: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "undecodable frame dropped");
                return;
            },
        };
        dispatch_frame(&self.table, self.handler.as_ref(), frame).await;
    }

    async fn teardown(&self) {
        {
            let mut writer = self.writer.lock().await;
            if let Some(mut sink) = writer.take() {
                let _ = sink.close().await;
            }
        }
        self.table.fail_all();
    }
}

/// Route one decoded frame: correlation token match first, then stray API
/// envelopes (logged and dropped, never misrouted to event handling), then
/// unsolicited events.
async fn dispatch_frame(table: &CorrelationTable, handler: &dyn EventHandler, frame: Value) {
    if let Some(token) = frame.get("echo").and_then(Value::as_str) {
        let token = token.to_owned();
        if !table.resolve(&token, frame) {
            warn!(token, "dropping response frame with no pending call");
        }
        return;
    }
    if looks_like_envelope(&frame) {
        warn!("dropping api envelope without correlation token");
        return;
    }
    handler.on_event(frame).await;
}

/// API responses carry `status`/`retcode` fields that events never do.
fn looks_like_envelope(frame: &Value) -> bool {
    frame.get("status").is_some() || frame.get("retcode").is_some()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct RecordingHandler {
        events: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl EventHandler for RecordingHandler {
        async fn on_event(&self, event: Value) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn connection(handler: Arc<RecordingHandler>) -> Arc<DuplexConnection> {
        DuplexConnection::new(
            WireConfig::new("ws://127.0.0.1:1/unused"),
            handler,
            CancellationToken::new(),
        )
    }

    #[test]
    fn reconnect_interval_is_clamped_to_minimum() {
        let mut config = WireConfig::new("ws://example");
        config.reconnect_interval = Duration::from_millis(10);
        assert_eq!(config.reconnect_every(), MIN_RECONNECT_INTERVAL);

        config.reconnect_interval = Duration::from_secs(60);
        assert_eq!(config.reconnect_every(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn frame_with_matching_token_resolves_pending_call() {
        let handler = Arc::new(RecordingHandler::default());
        let conn = connection(Arc::clone(&handler));

        let rx = conn.table.register("tok-1");
        dispatch_frame(
            &conn.table,
            handler.as_ref(),
            json!({"echo": "tok-1", "status": "ok", "data": {"id": 9}}),
        )
        .await;

        let response = rx.await.expect("resolved");
        assert_eq!(response["data"]["id"], 9);
        assert!(handler.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unmatched_envelope_is_dropped_not_treated_as_event() {
        let handler = Arc::new(RecordingHandler::default());
        let conn = connection(Arc::clone(&handler));

        dispatch_frame(
            &conn.table,
            handler.as_ref(),
            json!({"echo": "stale", "status": "ok"}),
        )
        .await;
        dispatch_frame(&conn.table, handler.as_ref(), json!({"retcode": 0, "data": {}})).await;

        assert!(
            handler.events.lock().unwrap().is_empty(),
            "envelope shapes must never reach event handling"
        );
    }

    #[tokio::test]
    async fn tokenless_event_frame_reaches_handler() {
        let handler = Arc::new(RecordingHandler::default());
        let conn = connection(Arc::clone(&handler));

        dispatch_frame(
            &conn.table,
            handler.as_ref(),
            json!({"post_type": "message", "message": "hi"}),
        )
        .await;

        let events = handler.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["message"], "hi");
    }

    #[tokio::test]
    async fn call_without_connection_fails_fast() {
        let conn = connection(Arc::new(RecordingHandler::default()));
        let err = conn
            .call("get_status", json!({}), Duration::from_secs(1))
            .await
            .expect_err("no socket");
        assert!(matches!(err, Error::NotConnected));
        assert_eq!(conn.table.pending_count(), 0, "failed call must unregister");
    }

    #[tokio::test]
    async fn call_after_stop_is_cancelled() {
        let conn = connection(Arc::new(RecordingHandler::default()));
        conn.stop().await;
        let err = conn
            .call("get_status", json!({}), Duration::from_secs(1))
            .await
            .expect_err("stopped");
        assert!(matches!(err, Error::Cancelled));
    }

    /// Echo server speaking just enough of the protocol to answer calls:
    /// replies to every request with the same correlation token.
    async fn spawn_echo_server(reply: bool) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                return;
            };
            while let Some(Ok(msg)) = ws.next().await {
                if !reply {
                    continue;
                }
                if let Message::Text(text) = msg
                    && let Ok(request) = serde_json::from_str::<Value>(text.as_str())
                    && let Some(token) = request.get("echo").and_then(Value::as_str)
                {
                    let response = json!({
                        "echo": token,
                        "status": "ok",
                        "data": {"value": 1},
                    });
                    let frame = serde_json::to_string(&response).unwrap_or_default();
                    if ws.send(Message::Text(frame.into())).await.is_err() {
                        return;
                    }
                }
            }
        });
        addr
    }

    async fn connect_to(addr: std::net::SocketAddr) -> Arc<DuplexConnection> {
        let conn = DuplexConnection::new(
            WireConfig::new(format!("ws://{addr}")),
            Arc::new(RecordingHandler::default()),
            CancellationToken::new(),
        );
        let _run = conn.start();
        for _ in 0..100 {
            if conn.is_connected().await {
                return conn;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("connection never established");
    }

    #[tokio::test]
    async fn call_returns_the_matching_response() {
        let addr = spawn_echo_server(true).await;
        let conn = connect_to(addr).await;

        let response = conn
            .call("get_value", json!({}), Duration::from_secs(2))
            .await
            .expect("response");
        assert_eq!(response["data"]["value"], 1);
        assert_eq!(conn.table.pending_count(), 0);

        conn.stop().await;
    }

    #[tokio::test]
    async fn call_without_response_times_out_and_unregisters() {
        let addr = spawn_echo_server(false).await;
        let conn = connect_to(addr).await;

        let err = conn
            .call("get_value", json!({}), Duration::from_millis(100))
            .await
            .expect_err("server never replies");
        assert!(matches!(err, Error::Timeout { .. }));
        assert_eq!(conn.table.pending_count(), 0, "timed-out call must unregister");

        conn.stop().await;
    }

    #[tokio::test]
    async fn stop_fails_pending_entries() {
        let conn = connection(Arc::new(RecordingHandler::default()));
        let rx = conn.table.register("pending");
        conn.stop().await;
        assert!(rx.await.is_err(), "pending waiter must be force-completed");
    }
}
