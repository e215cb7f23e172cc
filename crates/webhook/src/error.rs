use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures while authenticating or opening a webhook payload. All of
/// these reject the request at the HTTP boundary. Signature failures are
/// not represented here; verification reports a plain `bool` so callers
/// cannot distinguish why a signature was rejected.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid encoding key: {0}")]
    InvalidKey(String),

    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("block decrypt failed: {0}")]
    Cipher(String),

    #[error("invalid padding")]
    Padding,

    #[error("malformed envelope: {0}")]
    Envelope(&'static str),

    #[error("receiver id mismatch")]
    ReceiverMismatch,
}
