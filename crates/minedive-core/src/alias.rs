//! Alias sealing: a client name encrypted under a gateway's secret key.
//!
//! Wire format: `base64(nonce[24] || XChaCha20-Poly1305 ciphertext)`.
//! Only the gateway that sealed an alias can open it, and any altered byte
//! fails authentication.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};

use crate::error::{RelayError, RelayResult};
use crate::keys::{SecretKey, NONCE_LEN};

/// Seal `name` under `key` with the given nonce.
///
/// The caller is responsible for never reusing `nonce` with the same key.
pub fn seal_alias(name: &str, key: &SecretKey, nonce: &[u8; NONCE_LEN]) -> RelayResult<String> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(nonce), name.as_bytes())
        .map_err(|e| RelayError::SealFailed(e.to_string()))?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(nonce);
    sealed.extend(ciphertext);
    Ok(STANDARD.encode(sealed))
}

/// Open an alias sealed under `key`, returning the embedded name.
pub fn open_alias(alias: &str, key: &SecretKey) -> RelayResult<String> {
    let sealed = STANDARD
        .decode(alias)
        .map_err(|e| RelayError::MalformedAlias(e.to_string()))?;
    if sealed.len() < NONCE_LEN {
        return Err(RelayError::MalformedAlias(format!(
            "{} bytes, shorter than the nonce",
            sealed.len()
        )));
    }

    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let plaintext = cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| RelayError::DecryptionFailed)?;

    String::from_utf8(plaintext).map_err(|_| RelayError::DecryptionFailed)
}
