//! Channel adapter framework.
//!
//! Each messaging platform (Telegram, Slack, LINE, WeCom, ...) implements
//! the [`ChannelPlugin`] capability trait; the framework owns the adapter
//! lifecycle, the allowlist gate, redelivery suppression and the single
//! funnel that turns platform events into canonical bus messages.

pub mod chat_id;
pub mod core;
pub mod dedup;
pub mod error;
pub mod gating;
pub mod media;
pub mod plugin;
pub mod registry;

pub use {
    chat_id::CompositeChatId,
    core::ChannelCore,
    dedup::DedupRing,
    error::{Context, Error, Result},
    plugin::{ChannelOutbound, ChannelPlugin},
    registry::ChannelRegistry,
};
