//! Per-connection key material.
//!
//! Every connection gets a random 32-byte secret key, used only when that
//! client acts as a gateway for aliases, and a 24-byte nonce counter that
//! starts at zero. The public key is whatever the client announces.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use std::fmt;

use crate::error::{RelayError, RelayResult};

/// Secret key length in bytes.
pub const KEY_LEN: usize = 32;
/// Nonce length in bytes (XChaCha20-Poly1305).
pub const NONCE_LEN: usize = 24;

/// Symmetric gateway key. Never leaves the relay.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey([u8; KEY_LEN]);

impl SecretKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// Generate a secret key from the system CSPRNG.
pub fn generate_secret_key() -> RelayResult<SecretKey> {
    let rng = SystemRandom::new();
    let mut key = [0u8; KEY_LEN];
    rng.fill(&mut key).map_err(|_| RelayError::EntropyUnavailable)?;
    Ok(SecretKey(key))
}

/// Client-announced public key. Opaque to the relay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublicKey([u8; KEY_LEN]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse the base64 form used on the wire. Must decode to exactly 32 bytes.
    pub fn from_base64(encoded: &str) -> RelayResult<Self> {
        let raw = STANDARD
            .decode(encoded)
            .map_err(|e| RelayError::InvalidPublicKey(e.to_string()))?;
        let bytes: [u8; KEY_LEN] = raw.as_slice().try_into().map_err(|_| {
            RelayError::InvalidPublicKey(format!("expected {KEY_LEN} bytes, got {}", raw.len()))
        })?;
        Ok(Self(bytes))
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

/// Big-endian nonce counter owned by a gateway client.
///
/// Each alias sealed under a gateway consumes one value; the counter never
/// wraps, so a (key, nonce) pair is never used twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NonceCounter([u8; NONCE_LEN]);

impl NonceCounter {
    /// A counter starting at zero.
    pub fn new() -> Self {
        Self([0u8; NONCE_LEN])
    }

    pub fn current(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }

    /// Return the current value and advance the counter.
    ///
    /// Fails with `NonceExhausted` once the counter would overflow; the
    /// counter is left untouched in that case.
    pub fn take(&mut self) -> RelayResult<[u8; NONCE_LEN]> {
        let value = self.0;
        self.increment()?;
        Ok(value)
    }

    fn increment(&mut self) -> RelayResult<()> {
        if self.0.iter().all(|&b| b == 0xff) {
            return Err(RelayError::NonceExhausted);
        }
        for byte in self.0.iter_mut().rev() {
            if *byte < 0xff {
                *byte += 1;
                return Ok(());
            }
            *byte = 0;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_keys_differ() {
        let a = generate_secret_key().unwrap();
        let b = generate_secret_key().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn secret_key_debug_is_redacted() {
        let key = SecretKey::from_bytes([7u8; KEY_LEN]);
        assert_eq!(format!("{key:?}"), "SecretKey(..)");
    }

    #[test]
    fn public_key_base64() {
        let pk = PublicKey::from_bytes([9u8; KEY_LEN]);
        let parsed = PublicKey::from_base64(&pk.to_base64()).unwrap();
        assert_eq!(parsed, pk);
    }

    #[test]
    fn public_key_wrong_length() {
        let short = STANDARD.encode([1u8; 16]);
        assert!(matches!(
            PublicKey::from_base64(&short),
            Err(RelayError::InvalidPublicKey(_))
        ));
        assert!(PublicKey::from_base64("@@not base64@@").is_err());
    }

    #[test]
    fn nonce_counter_advances() {
        let mut counter = NonceCounter::new();
        assert_eq!(counter.take().unwrap(), [0u8; NONCE_LEN]);
        let second = counter.take().unwrap();
        assert_eq!(second[NONCE_LEN - 1], 1);
        assert_eq!(counter.current()[NONCE_LEN - 1], 2);
    }

    #[test]
    fn nonce_counter_carries() {
        let mut start = [0u8; NONCE_LEN];
        start[NONCE_LEN - 1] = 0xff;
        let mut counter = NonceCounter(start);
        counter.take().unwrap();
        assert_eq!(counter.current()[NONCE_LEN - 2], 1);
        assert_eq!(counter.current()[NONCE_LEN - 1], 0);
    }

    #[test]
    fn nonce_counter_exhausts() {
        let mut counter = NonceCounter([0xff; NONCE_LEN]);
        assert!(matches!(counter.take(), Err(RelayError::NonceExhausted)));
        assert_eq!(counter.current(), &[0xff; NONCE_LEN]);
    }
}
