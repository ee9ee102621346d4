//! Alias issuance and resolution.
//!
//! An alias is a client name sealed under a gateway client's secret key.
//! Whoever holds the alias can ask the relay for the named client's public
//! key by naming the gateway, without ever learning the name itself.

use super::registry::ConnectionRegistry;
use crate::session::Client;
use minedive_core::{open_alias, seal_alias, RelayResult};
use std::sync::Arc;
use tracing::debug;

/// Issues and resolves aliases against the live registry.
pub struct AliasCodec {
    registry: Arc<ConnectionRegistry>,
}

impl AliasCodec {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Seal `target_name` under `gateway`, consuming one of its nonces.
    pub async fn issue_alias(&self, target_name: &str, gateway: &Client) -> RelayResult<String> {
        let nonce = gateway.next_nonce().await?;
        seal_alias(target_name, gateway.secret_key(), &nonce)
    }

    /// Open `alias` with the key of the client named `gateway_name` and
    /// return the base64 public key of the client named inside it.
    pub async fn resolve_alias(&self, alias: &str, gateway_name: &str) -> RelayResult<String> {
        let gateway = self.registry.lookup_by_name(gateway_name).await?;
        let target_name = open_alias(alias, gateway.secret_key())?;
        let target = self.registry.lookup_by_name(&target_name).await?;
        debug!(gateway = gateway.id(), target = target.id(), "alias resolved");
        Ok(target.public_key().await.to_base64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minedive_core::{generate_secret_key, PublicKey, RelayError};
    use tokio::sync::mpsc;

    async fn register(registry: &ConnectionRegistry, name: &str, pk: u8) -> Arc<Client> {
        let (tx, _rx) = mpsc::channel(8);
        let client = Arc::new(Client::new(
            "127.0.0.1:9".into(),
            generate_secret_key().unwrap(),
            tx,
        ));
        client
            .set_profile(name.into(), PublicKey::from_bytes([pk; 32]))
            .await;
        registry.register(client.clone()).await.unwrap();
        client
    }

    #[tokio::test]
    async fn issue_then_resolve() {
        let registry = Arc::new(ConnectionRegistry::new(0));
        let codec = AliasCodec::new(registry.clone());
        let gw = register(&registry, "alice", 1).await;
        register(&registry, "bob", 2).await;
        register(&registry, "zoë", 3).await;

        for (name, pk) in [("bob", 2u8), ("zoë", 3)] {
            let alias = codec.issue_alias(name, &gw).await.unwrap();
            let key = codec.resolve_alias(&alias, "alice").await.unwrap();
            assert_eq!(key, PublicKey::from_bytes([pk; 32]).to_base64());
        }
    }

    #[tokio::test]
    async fn each_issue_uses_a_new_nonce() {
        let registry = Arc::new(ConnectionRegistry::new(0));
        let codec = AliasCodec::new(registry.clone());
        let gw = register(&registry, "alice", 1).await;
        let a = codec.issue_alias("bob", &gw).await.unwrap();
        let b = codec.issue_alias("bob", &gw).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn wrong_gateway_fails() {
        let registry = Arc::new(ConnectionRegistry::new(0));
        let codec = AliasCodec::new(registry.clone());
        let alice = register(&registry, "alice", 1).await;
        register(&registry, "bob", 2).await;
        register(&registry, "carol", 3).await;

        let alias = codec.issue_alias("bob", &alice).await.unwrap();
        assert!(matches!(
            codec.resolve_alias(&alias, "carol").await,
            Err(RelayError::DecryptionFailed)
        ));
    }

    #[tokio::test]
    async fn missing_gateway_or_target() {
        let registry = Arc::new(ConnectionRegistry::new(0));
        let codec = AliasCodec::new(registry.clone());
        let alice = register(&registry, "alice", 1).await;

        let alias = codec.issue_alias("ghost", &alice).await.unwrap();
        assert!(matches!(
            codec.resolve_alias(&alias, "nobody").await,
            Err(RelayError::ClientNotFound(_))
        ));
        assert!(matches!(
            codec.resolve_alias(&alias, "alice").await,
            Err(RelayError::ClientNotFound(_))
        ));
    }

    #[tokio::test]
    async fn malformed_alias() {
        let registry = Arc::new(ConnectionRegistry::new(0));
        let codec = AliasCodec::new(registry.clone());
        register(&registry, "alice", 1).await;
        assert!(matches!(
            codec.resolve_alias("not base64!", "alice").await,
            Err(RelayError::MalformedAlias(_))
        ));
    }
}
