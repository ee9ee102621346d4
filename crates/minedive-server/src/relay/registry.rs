//! Connection registry.
//!
//! Holds every live client in registration order and hands out
//! monotonically increasing ids. Locks are held only for the table
//! operation itself, never across a send.

use crate::session::Client;
use minedive_core::{RelayError, RelayResult};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// Registry of connected clients.
pub struct ConnectionRegistry {
    /// Clients in registration order.
    clients: RwLock<Vec<Arc<Client>>>,
    /// Monotonic id counter.
    next_id: Mutex<u64>,
}

impl ConnectionRegistry {
    /// Create an empty registry whose first id is `first_id`.
    pub fn new(first_id: u64) -> Self {
        Self {
            clients: RwLock::new(Vec::new()),
            next_id: Mutex::new(first_id),
        }
    }

    /// Assign the next id to `client` and append it.
    ///
    /// Registering the same client twice is a no-op that returns its
    /// existing id. Fails with `IdsExhausted` once the counter cannot
    /// advance; ids never wrap.
    pub async fn register(&self, client: Arc<Client>) -> RelayResult<u64> {
        let mut clients = self.clients.write().await;
        if clients.iter().any(|c| Arc::ptr_eq(c, &client)) {
            return Ok(client.id());
        }

        let id = {
            let mut next = self.next_id.lock().await;
            let id = *next;
            *next = id.checked_add(1).ok_or(RelayError::IdsExhausted)?;
            id
        };
        client.assign_id(id);
        clients.push(client.clone());

        info!(client_id = id, remote = %client.remote_addr(), "client registered");
        Ok(id)
    }

    /// Remove the client with `id`. Returns it if it was present.
    pub async fn unregister(&self, id: u64) -> Option<Arc<Client>> {
        let mut clients = self.clients.write().await;
        let pos = clients.iter().position(|c| c.id() == id)?;
        let removed = clients.remove(pos);
        debug!(client_id = id, remaining = clients.len(), "client unregistered");
        Some(removed)
    }

    /// First client in registration order whose name is `name`.
    pub async fn lookup_by_name(&self, name: &str) -> RelayResult<Arc<Client>> {
        let clients = self.clients.read().await;
        for client in clients.iter() {
            if client.name().await == name {
                return Ok(client.clone());
            }
        }
        Err(RelayError::ClientNotFound(name.to_string()))
    }

    /// Every client whose name is `name`, in registration order.
    pub async fn find_all_by_name(&self, name: &str) -> Vec<Arc<Client>> {
        let mut matches = Vec::new();
        for client in self.snapshot_all().await {
            if client.name().await == name {
                matches.push(client);
            }
        }
        matches
    }

    /// Consistent copy of the current client list.
    pub async fn snapshot_all(&self) -> Vec<Arc<Client>> {
        self.clients.read().await.clone()
    }

    /// Pick a client other than `requester` at the index chosen by `choose`.
    ///
    /// `choose` receives the number of registered clients and must return an
    /// index below it. Fails with `NoPeerAvailable` when fewer than two
    /// clients are registered and with `SamePeerSelected` when the chosen
    /// index is the requester itself. There is no retry.
    pub async fn random_other<F>(&self, requester: &Client, choose: F) -> RelayResult<Arc<Client>>
    where
        F: FnOnce(usize) -> usize,
    {
        let clients = self.clients.read().await;
        if clients.len() < 2 {
            return Err(RelayError::NoPeerAvailable);
        }
        let picked = clients
            .get(choose(clients.len()))
            .cloned()
            .ok_or(RelayError::NoPeerAvailable)?;
        drop(clients);

        if std::ptr::eq(Arc::as_ptr(&picked), requester) {
            return Err(RelayError::SamePeerSelected);
        }
        Ok(picked)
    }

    /// Number of registered clients.
    pub async fn count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Log every registered client at debug level.
    pub async fn dump(&self) {
        let clients = self.snapshot_all().await;
        if clients.is_empty() {
            debug!("registry empty");
        }
        for client in clients {
            let name = client.name().await;
            debug!(client_id = client.id(), name = %name, remote = %client.remote_addr(), "registered client");
        }
    }
}
