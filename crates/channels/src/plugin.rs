use {anyhow::Result, async_trait::async_trait};

/// Core channel capability trait. Each messaging platform implements this;
/// the framework depends only on the trait, never on a concrete adapter.
///
/// Lifecycle: Stopped → Starting → Running → Stopping → Stopped. `start` is
/// called at most once per instance; `stop` must release every task and
/// timer the adapter spawned and must be safe to call even when `start`
/// failed partway.
#[async_trait]
pub trait ChannelPlugin: Send + Sync {
    /// Channel identifier (e.g. "telegram", "wecom").
    fn id(&self) -> &str;

    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Connect to the platform and begin producing inbound messages.
    async fn start(&mut self) -> Result<()>;

    /// Tear down the connection and all spawned tasks.
    async fn stop(&mut self) -> Result<()>;

    /// Whether the adapter is currently running.
    fn is_running(&self) -> bool;

    /// Outbound adapter for sending messages, when the channel supports it.
    fn outbound(&self) -> Option<&dyn ChannelOutbound>;
}

/// Send messages to a channel.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    async fn send_text(&self, to: &str, text: &str) -> Result<()>;

    /// Send a "typing" indicator. No-op by default.
    async fn send_typing(&self, _to: &str) -> Result<()> {
        Ok(())
    }
}
