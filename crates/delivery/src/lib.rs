//! Outbound delivery pipeline: chunking, markup translation, placeholder
//! replacement and fallback ordering, shared by every channel adapter.
//!
//! The pipeline applies the same steps to every send: consume the pending
//! "thinking" placeholder, split into platform-safe chunks without breaking
//! fenced code blocks, translate markup, edit the placeholder in place for
//! the first chunk, prefer the platform's low-cost reply path when a valid
//! token exists, retry a rejected send once in plain text, and keep going
//! after a failed chunk (only the last error is reported).

pub mod chunk;
pub mod markup;
pub mod pipeline;
pub mod placeholder;
pub mod reply_token;

pub use {
    chunk::split_chunks,
    markup::render_html,
    pipeline::{DeliveryPipeline, PlatformSender, SendMode},
    placeholder::PlaceholderMap,
    reply_token::ReplyTokenStore,
};
