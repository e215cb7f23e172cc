//! Credentials for a webhook-backed channel.

use {
    secrecy::{ExposeSecret, SecretString},
    serde::Deserialize,
};

use crate::{
    crypt::decrypt_envelope,
    error::{Error, Result},
    verify::verify_signature,
};

/// Per-channel webhook credentials. Secret material is held behind a
/// redacting `Debug`, so dumping a config in logs never leaks it.
#[derive(Clone, Debug, Deserialize)]
pub struct WebhookConfig {
    /// Shared secret the platform signs request bodies with.
    pub secret: SecretString,
    /// Base64 key for platforms that encrypt the body, without the
    /// trailing `=`. Absent for plaintext webhooks.
    #[serde(default)]
    pub encoding_key: Option<SecretString>,
    /// Tenant or app id expected in the envelope's receiver field.
    #[serde(default)]
    pub receiver_id: Option<String>,
}

impl WebhookConfig {
    pub fn verify(&self, signature: &str, body: &[u8]) -> bool {
        verify_signature(self.secret.expose_secret(), signature, body)
    }

    /// Decrypt an encrypted body with the configured key, checking the
    /// envelope's receiver against `receiver_id`.
    pub fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>> {
        let key = self
            .encoding_key
            .as_ref()
            .ok_or_else(|| Error::InvalidKey("no encoding key configured".into()))?;
        decrypt_envelope(
            key.expose_secret(),
            ciphertext,
            self.receiver_id.as_deref().unwrap_or_default(),
        )
    }
}
