//! Per-connection client state.
//!
//! A `Client` is created when a WebSocket is accepted and lives as long as
//! that connection. The registry and other sessions hold `Arc<Client>`
//! references for lookup and for pushing messages.

use minedive_core::{
    encode_server_message, NonceCounter, PublicKey, RelayResult, SecretKey, ServerMessage,
    NONCE_LEN,
};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

/// Name and key announced by the client in its `username` message.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub name: String,
    pub public_key: PublicKey,
}

/// A connected client.
pub struct Client {
    /// Assigned by the registry on registration.
    id: AtomicU64,
    remote_addr: String,
    /// Gateway key for aliases sealed under this client.
    secret_key: SecretKey,
    /// Gateway nonce counter, advanced on every alias issued under this client.
    nonce: Mutex<NonceCounter>,
    profile: RwLock<Profile>,
    /// Queue drained by this connection's session loop, the socket's only writer.
    outbound: mpsc::Sender<String>,
}

impl Client {
    pub fn new(remote_addr: String, secret_key: SecretKey, outbound: mpsc::Sender<String>) -> Self {
        Self {
            id: AtomicU64::new(0),
            remote_addr,
            secret_key,
            nonce: Mutex::new(NonceCounter::new()),
            profile: RwLock::new(Profile::default()),
            outbound,
        }
    }

    pub fn id(&self) -> u64 {
        self.id.load(Ordering::Acquire)
    }

    pub(crate) fn assign_id(&self, id: u64) {
        self.id.store(id, Ordering::Release);
    }

    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    pub async fn name(&self) -> String {
        self.profile.read().await.name.clone()
    }

    pub async fn public_key(&self) -> PublicKey {
        self.profile.read().await.public_key
    }

    pub async fn set_profile(&self, name: String, public_key: PublicKey) {
        let mut profile = self.profile.write().await;
        profile.name = name;
        profile.public_key = public_key;
    }

    /// Consume the next gateway nonce.
    pub async fn next_nonce(&self) -> RelayResult<[u8; NONCE_LEN]> {
        self.nonce.lock().await.take()
    }

    /// Queue a relay message for this client. Returns false if it was dropped.
    pub fn send(&self, msg: &ServerMessage) -> bool {
        match encode_server_message(msg) {
            Ok(frame) => self.send_raw(frame),
            Err(e) => {
                warn!(client_id = self.id(), error = %e, "failed to encode message");
                false
            }
        }
    }

    /// Queue an already-encoded frame for this client. Returns false if it was dropped.
    pub fn send_raw(&self, frame: String) -> bool {
        match self.outbound.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(client_id = self.id(), "outbound queue full, dropping message");
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!(client_id = self.id(), "connection closed, dropping message");
                false
            }
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id())
            .field("remote_addr", &self.remote_addr)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minedive_core::generate_secret_key;

    fn client(capacity: usize) -> (Client, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        let key = generate_secret_key().unwrap();
        (Client::new("127.0.0.1:1000".into(), key, tx), rx)
    }

    #[tokio::test]
    async fn profile_starts_empty() {
        let (c, _rx) = client(4);
        assert_eq!(c.name().await, "");
        assert_eq!(c.public_key().await, PublicKey::default());
    }

    #[tokio::test]
    async fn nonces_are_fresh() {
        let (c, _rx) = client(4);
        let a = c.next_nonce().await.unwrap();
        let b = c.next_nonce().await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn send_queues_json() {
        let (c, mut rx) = client(4);
        assert!(c.send(&ServerMessage::Id { id: 5 }));
        assert_eq!(rx.recv().await.unwrap(), r#"{"type":"id","id":5}"#);
    }

    #[tokio::test]
    async fn send_drops_when_full_or_closed() {
        let (c, rx) = client(1);
        assert!(c.send_raw("one".into()));
        assert!(!c.send_raw("two".into()));
        drop(rx);
        assert!(!c.send_raw("three".into()));
    }
}
