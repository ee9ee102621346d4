//! minedive protocol messages.
//!
//! Every message is a JSON object carrying a `type` discriminator; the
//! remaining fields depend on the kind.

use serde::{Deserialize, Serialize};

/// `contact` value sent to the client that asked for a peer.
pub const CONTACT_REQUESTER: u8 = 0;
/// `contact` value sent to the client that was picked as the peer.
pub const CONTACT_PEER: u8 = 1;

/// Messages sent by clients to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Set display name and public key.
    Username {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
        name: String,
        /// Base64 of the 32-byte public key.
        pk: String,
    },
    /// Resolve an alias to a public key through a gateway client.
    #[serde(rename = "getkey")]
    GetKey { alias: String, gw: String },
    /// Ask to be paired with a random peer.
    #[serde(rename = "getpeers")]
    GetPeers,
    Offer(Signal),
    Answer(Signal),
    /// Legacy kind, accepted and ignored.
    Message,
    /// Legacy kind, accepted and ignored.
    #[serde(rename = "getalias")]
    GetAlias,
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Wire name of this message kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Username { .. } => "username",
            ClientMessage::GetKey { .. } => "getkey",
            ClientMessage::GetPeers => "getpeers",
            ClientMessage::Offer(_) => "offer",
            ClientMessage::Answer(_) => "answer",
            ClientMessage::Message => "message",
            ClientMessage::GetAlias => "getalias",
            ClientMessage::Unknown => "unknown",
        }
    }
}

/// Session-negotiation payload shared by `offer` and `answer`.
///
/// Only `target` is interpreted; `name` and `sdp` travel opaquely and may
/// be any JSON value (a bare SDP string or a full session description).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    #[serde(default)]
    pub name: serde_json::Value,
    pub target: String,
    #[serde(default)]
    pub sdp: serde_json::Value,
}

/// Messages sent by the relay to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Identity announcement, sent once after acceptance.
    Id { id: u64 },
    /// Reply to `getkey`.
    Key { alias: String, key: String },
    /// Pairing result.
    #[serde(rename = "userlist")]
    UserList { contact: u8, users: Vec<UserEntry> },
}

/// One entry of a `userlist` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    pub name: String,
    pub alias: String,
}
