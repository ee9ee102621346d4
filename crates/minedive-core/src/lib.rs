//! minedive-core: shared protocol library for the minedive signaling relay.
//!
//! Provides the JSON message types and codec, per-connection key material,
//! and the authenticated-encryption primitives behind peer aliases.

pub mod alias;
pub mod codec;
pub mod error;
pub mod keys;
pub mod messages;

// Re-export commonly used items at crate root.
pub use alias::{open_alias, seal_alias};
pub use codec::{decode_client_message, encode_server_message};
pub use error::{RelayError, RelayResult};
pub use keys::{generate_secret_key, NonceCounter, PublicKey, SecretKey, NONCE_LEN};
pub use messages::{ClientMessage, ServerMessage, UserEntry};
