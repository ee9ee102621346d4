//! Relay core: client registry, peer pairing, alias issuance.

pub mod alias;
pub mod pairing;
pub mod registry;

pub use alias::AliasCodec;
pub use pairing::PeerAssigner;
pub use registry::ConnectionRegistry;
