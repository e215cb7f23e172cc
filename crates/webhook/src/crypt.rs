//! Shared-key envelope decryption.
//!
//! Platforms using this scheme wrap the payload as
//! `16 random bytes ‖ u32 BE payload length ‖ payload ‖ receiver id`,
//! AES-256-CBC encrypted with a base64 key and the key's first 16 bytes as
//! IV, then base64 encoded. Padding is PKCS#7 with every padding byte
//! checked. The trailing receiver id binds the ciphertext to one tenant;
//! a mismatch is an authentication failure, not a warning.

use {
    aes::cipher::{BlockDecryptMut, KeyIvInit, block_padding::NoPadding},
    base64::{Engine, engine::general_purpose::STANDARD as BASE64},
};

use crate::error::{Error, Result};

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const BLOCK: usize = 16;
const HEADER: usize = BLOCK + 4;

/// Decrypt a base64 ciphertext and return the payload bytes.
///
/// `encoding_key` is the 43-character base64 key as platforms distribute
/// it, without the trailing `=`.
pub fn decrypt_envelope(
    encoding_key: &str,
    ciphertext: &str,
    expected_receiver: &str,
) -> Result<Vec<u8>> {
    let key = BASE64
        .decode(format!("{encoding_key}="))
        .map_err(|err| Error::InvalidKey(err.to_string()))?;
    if key.len() != 32 {
        return Err(Error::InvalidKey(format!(
            "expected 32 bytes, got {}",
            key.len()
        )));
    }
    let iv = &key[..BLOCK];

    let mut buf = BASE64.decode(ciphertext)?;
    if buf.is_empty() || buf.len() % BLOCK != 0 {
        return Err(Error::Envelope("ciphertext not block-aligned"));
    }

    let cipher = Aes256CbcDec::new_from_slices(&key, iv)
        .map_err(|err| Error::Cipher(err.to_string()))?;
    let padded = cipher
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|err| Error::Cipher(err.to_string()))?;
    let plain = strip_pkcs7(padded)?;

    if plain.len() < HEADER {
        return Err(Error::Envelope("plaintext shorter than header"));
    }
    let declared = u32::from_be_bytes(
        plain[BLOCK..HEADER]
            .try_into()
            .map_err(|_| Error::Envelope("unreadable length prefix"))?,
    ) as usize;
    let payload_end = HEADER
        .checked_add(declared)
        .ok_or(Error::Envelope("payload length overflow"))?;
    if payload_end > plain.len() {
        return Err(Error::Envelope("payload length exceeds plaintext"));
    }

    let receiver = &plain[payload_end..];
    if receiver != expected_receiver.as_bytes() {
        return Err(Error::ReceiverMismatch);
    }
    Ok(plain[HEADER..payload_end].to_vec())
}

/// Strip PKCS#7 padding, validating every padding byte rather than only
/// the last one.
fn strip_pkcs7(data: &[u8]) -> Result<&[u8]> {
    let Some(&last) = data.last() else {
        return Err(Error::Padding);
    };
    let pad = last as usize;
    if pad == 0 || pad > BLOCK || pad > data.len() {
        return Err(Error::Padding);
    }
    let (body, padding) = data.split_at(data.len() - pad);
    if padding.iter().any(|&b| b != last) {
        return Err(Error::Padding);
    }
    Ok(body)
}
