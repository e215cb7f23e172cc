//! In-process message bus decoupling channel adapters from the routing layer.
//!
//! Two bounded streams (inbound from adapters, outbound from the routing
//! layer) plus a channel-name → handler registry for synchronous dispatch.
//! Delivery is best-effort and at-most-once by contract: publishing never
//! blocks and silently drops when the bus is closed or a queue is full.

pub mod bus;
pub mod message;

pub use {
    bus::{Bus, DEFAULT_QUEUE_DEPTH, OutboundHandler},
    message::{InboundMessage, OutboundMessage, meta},
};
