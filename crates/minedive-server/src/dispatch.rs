//! Message dispatcher: decodes client frames and routes them to the
//! registry, pairing and alias operations.
//!
//! Every failure is handled here. A bad message is logged and dropped;
//! it never ends the connection and never produces an error reply.

use crate::relay::{AliasCodec, ConnectionRegistry, PeerAssigner};
use crate::session::Client;
use minedive_core::messages::{Signal, CONTACT_PEER, CONTACT_REQUESTER};
use minedive_core::{
    decode_client_message, ClientMessage, PublicKey, RelayError, RelayResult, ServerMessage,
    UserEntry,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Routes decoded messages for all sessions.
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
    peers: PeerAssigner,
    aliases: AliasCodec,
}

impl Dispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            peers: PeerAssigner::new(registry.clone()),
            aliases: AliasCodec::new(registry.clone()),
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Handle one raw frame from `client`.
    ///
    /// Returns the direct reply for `client`, if any. Messages for other
    /// clients are pushed onto their outbound queues.
    pub async fn dispatch(&self, client: &Arc<Client>, frame: &str) -> Option<ServerMessage> {
        let msg = match decode_client_message(frame.as_bytes()) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(client_id = client.id(), error = %e, "dropping undecodable message");
                return None;
            }
        };

        let kind = msg.kind();
        debug!(client_id = client.id(), kind, "message received");
        match self.handle(client, msg, frame).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(client_id = client.id(), kind, error = %e, "message not handled");
                None
            }
        }
    }

    async fn handle(
        &self,
        client: &Arc<Client>,
        msg: ClientMessage,
        frame: &str,
    ) -> RelayResult<Option<ServerMessage>> {
        match msg {
            ClientMessage::Username { id, name, pk } => {
                self.set_username(client, id, name, &pk).await?;
                Ok(None)
            }
            ClientMessage::GetKey { alias, gw } => self.get_key(client, alias, &gw).await.map(Some),
            ClientMessage::GetPeers => self.get_peers(client).await.map(Some),
            ClientMessage::Offer(signal) | ClientMessage::Answer(signal) => {
                self.forward_to_target(&signal, frame).await;
                Ok(None)
            }
            ClientMessage::Message | ClientMessage::GetAlias => {
                debug!(client_id = client.id(), "legacy message kind not used");
                Ok(None)
            }
            ClientMessage::Unknown => {
                info!(client_id = client.id(), "ignoring unrecognized message kind");
                Ok(None)
            }
        }
    }

    async fn set_username(
        &self,
        client: &Client,
        claimed_id: Option<u64>,
        name: String,
        pk: &str,
    ) -> RelayResult<()> {
        let public_key = PublicKey::from_base64(pk)?;
        if let Some(claimed) = claimed_id.filter(|&c| c != client.id()) {
            warn!(client_id = client.id(), claimed, "username message carries a foreign id");
        }
        info!(client_id = client.id(), name = %name, "username set");
        client.set_profile(name, public_key).await;
        Ok(())
    }

    async fn get_key(&self, client: &Client, alias: String, gw: &str) -> RelayResult<ServerMessage> {
        if client.name().await == gw {
            return Err(RelayError::SelfGateway);
        }
        let key = self.aliases.resolve_alias(&alias, gw).await?;
        debug!(client_id = client.id(), gateway = %gw, "sending key");
        Ok(ServerMessage::Key { alias, key })
    }

    /// Pair `client` with a random peer and tell both sides about each other.
    ///
    /// Each side's name is sealed under the other side as gateway. The
    /// peer's copy is pushed to its queue; the requester's copy is returned.
    async fn get_peers(&self, client: &Arc<Client>) -> RelayResult<ServerMessage> {
        let peer = self.peers.pick_other_peer(client).await?;
        let client_name = client.name().await;
        let peer_name = peer.name().await;

        let client_alias = self.aliases.issue_alias(&client_name, &peer).await?;
        let peer_alias = self.aliases.issue_alias(&peer_name, client).await?;

        info!(requester = client.id(), peer = peer.id(), "peers paired");
        peer.send(&ServerMessage::UserList {
            contact: CONTACT_PEER,
            users: vec![UserEntry {
                name: client_name,
                alias: client_alias,
            }],
        });
        Ok(ServerMessage::UserList {
            contact: CONTACT_REQUESTER,
            users: vec![UserEntry {
                name: peer_name,
                alias: peer_alias,
            }],
        })
    }

    /// Forward `frame` verbatim to every client named `signal.target`.
    async fn forward_to_target(&self, signal: &Signal, frame: &str) {
        let targets = self.registry.find_all_by_name(&signal.target).await;
        if targets.is_empty() {
            debug!(target = %signal.target, "no client with target name, dropping");
        }
        for target in targets {
            target.send_raw(frame.to_owned());
        }
    }
}
