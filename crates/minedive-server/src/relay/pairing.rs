//! Random peer pairing.
//!
//! A requester is matched with one other registered client chosen
//! uniformly at random. Picking the requester itself fails instead of
//! retrying, so callers simply decline the pairing.

use super::registry::ConnectionRegistry;
use crate::session::Client;
use minedive_core::RelayResult;
use rand::Rng;
use std::sync::Arc;
use tracing::debug;

/// Chooses pairing partners from the registry.
pub struct PeerAssigner {
    registry: Arc<ConnectionRegistry>,
}

impl PeerAssigner {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Pick one other client for `requester`.
    pub async fn pick_other_peer(&self, requester: &Client) -> RelayResult<Arc<Client>> {
        let peer = self
            .registry
            .random_other(requester, |len| rand::thread_rng().gen_range(0..len))
            .await?;
        debug!(requester = requester.id(), peer = peer.id(), "peer picked");
        Ok(peer)
    }
}
