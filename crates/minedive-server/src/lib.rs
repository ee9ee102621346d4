//! minedive-server: signaling relay for peer-to-peer connections.
//!
//! Clients connect over WebSocket, get a numeric id, announce a name and
//! public key, and ask to be paired with a random peer. Names are handed
//! out as aliases sealed under a gateway client's key, and `offer`/`answer`
//! messages are forwarded verbatim to the named target.

pub mod config;
pub mod dispatch;
pub mod relay;
pub mod server;
pub mod session;
pub mod transport;

pub use config::{CliOverrides, ServerConfig};
pub use server::RelayServer;
