use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// No live connection to write to.
    #[error("not connected")]
    NotConnected,

    /// The call's deadline elapsed with no matching response.
    #[error("call timed out: {action}")]
    Timeout { action: String },

    /// The owning connection was stopped while the call was pending.
    #[error("call cancelled: connection stopped")]
    Cancelled,

    #[error(transparent)]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
