//! Duplex RPC-over-stream plumbing for adapters whose platform speaks one
//! long-lived websocket carrying both unsolicited events and responses to
//! API calls the adapter itself issued.
//!
//! [`CorrelationTable`] links a request token to its eventual response;
//! [`DuplexConnection`] owns the socket lifecycle (connect, keepalive,
//! reconnect) and routes incoming frames to the table or to the adapter's
//! event handler.

pub mod connection;
pub mod correlation;
pub mod error;
pub mod reply;

pub use {
    connection::{DuplexConnection, EventHandler, WireConfig},
    correlation::CorrelationTable,
    error::{Error, Result},
    reply::{IdentityReply, LoginInfo},
};
