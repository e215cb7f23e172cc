//! Decoding for duplex API responses that come in more than one shape.

use {serde::Deserialize, serde_json::Value};

/// Identity returned by a successful login/status call.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInfo {
    pub user_id: i64,
    #[serde(default)]
    pub nickname: String,
}

/// Response to an identity call.
///
/// Variant order is the decode priority and part of the contract: the
/// typed login shape is tried first, the generic envelope only when the
/// typed decode fails. Some platforms answer with the identity inlined,
/// others wrap it in an envelope's `data` field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum IdentityReply {
    Login(LoginInfo),
    Envelope {
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        retcode: Option<i64>,
        #[serde(default)]
        data: Value,
    },
}

impl IdentityReply {
    /// Extract the identity from whichever shape arrived.
    #[must_use]
    pub fn into_login(self) -> Option<LoginInfo> {
        match self {
            Self::Login(info) => Some(info),
            Self::Envelope { data, .. } => serde_json::from_value(data).ok(),
        }
    }
}
