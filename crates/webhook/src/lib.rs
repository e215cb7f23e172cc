//! Webhook ingestion: signature verification, envelope decryption, and an
//! HTTP listener that fans verified events out to adapter tasks.
//!
//! The boundary rule is strict: a request that fails signature or padding
//! checks is answered with 4xx and its content never reaches the bus.

pub mod config;
pub mod crypt;
pub mod error;
pub mod server;
pub mod verify;

pub use {
    config::WebhookConfig,
    crypt::decrypt_envelope,
    error::{Error, Result},
    server::{WebhookChannel, router},
    verify::verify_signature,
};
