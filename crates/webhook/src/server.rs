//! HTTP listener for webhook-style platforms.
//!
//! One route handles the platform's POST callbacks: verify the signature,
//! decode (and usually decrypt) the body into events, drop redelivered
//! events by id, then spawn one task per event so a slow consumer never
//! delays the HTTP response the platform is waiting on.

use std::sync::{Arc, Mutex};

use {
    async_trait::async_trait,
    axum::{
        Router,
        body::Bytes,
        extract::State,
        http::{HeaderMap, StatusCode},
        routing::post,
    },
    estuary_channels::dedup::DedupRing,
    tracing::{debug, warn},
};

/// Platform-specific half of the webhook listener.
#[async_trait]
pub trait WebhookChannel: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Check the request signature. `timestamp` and `nonce` come from the
    /// platform's headers and are empty when absent.
    fn verify(&self, signature: &str, timestamp: &str, nonce: &str, body: &[u8]) -> bool;

    /// Decode the verified body into individual events. Decryption
    /// happens here for platforms that encrypt the body.
    fn decode(&self, body: &[u8]) -> anyhow::Result<Vec<serde_json::Value>>;

    /// Stable id for deduplication, empty when the platform provides none.
    fn event_id(&self, event: &serde_json::Value) -> String;

    /// Consume one event. Runs on its own task, after the HTTP response.
    async fn handle_event(&self, event: serde_json::Value);
}

struct ListenerState {
    channel: Arc<dyn WebhookChannel>,
    dedup: Mutex<DedupRing>,
}

/// Build a router exposing the channel's callback endpoint at `/webhook`.
pub fn router(channel: Arc<dyn WebhookChannel>) -> Router {
    let state = Arc::new(ListenerState {
        channel,
        dedup: Mutex::new(DedupRing::default()),
    });
    Router::new()
        .route("/webhook", post(receive))
        .with_state(state)
}

async fn receive(
    State(state): State<Arc<ListenerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = header_str(&headers, "x-signature");
    let timestamp = header_str(&headers, "x-timestamp");
    let nonce = header_str(&headers, "x-nonce");

    if !state.channel.verify(signature, timestamp, nonce, &body) {
        warn!(channel = state.channel.name(), "webhook signature rejected");
        return StatusCode::UNAUTHORIZED;
    }

    let events = match state.channel.decode(&body) {
        Ok(events) => events,
        Err(err) => {
            warn!(channel = state.channel.name(), error = %err, "webhook body rejected");
            return StatusCode::BAD_REQUEST;
        }
    };

    for event in events {
        let id = state.channel.event_id(&event);
        let duplicate = {
            let mut dedup = state.dedup.lock().unwrap_or_else(|e| e.into_inner());
            dedup.is_duplicate(&id)
        };
        if duplicate {
            debug!(channel = state.channel.name(), event_id = %id, "duplicate event dropped");
            continue;
        }
        let channel = Arc::clone(&state.channel);
        tokio::spawn(async move {
            channel.handle_event(event).await;
        });
    }

    StatusCode::OK
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}
