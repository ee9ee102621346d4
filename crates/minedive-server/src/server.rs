//! Core server: accepts connections and runs one session task per client.
//!
//! Owns the connection registry and the dispatcher that every session
//! shares, and coordinates shutdown of all sessions.

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::relay::ConnectionRegistry;
use crate::session::connection::{ConnectionSession, SessionLimits};
use crate::transport::{websocket, WebSocketConnection};
use minedive_core::{generate_secret_key, RelayResult};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// The minedive relay server.
pub struct RelayServer {
    config: ServerConfig,
    registry: Arc<ConnectionRegistry>,
    dispatcher: Arc<Dispatcher>,
    shutdown_tx: broadcast::Sender<()>,
    /// Subscribed at construction so a shutdown sent before `serve` starts
    /// is not lost.
    shutdown_rx: broadcast::Receiver<()>,
}

impl RelayServer {
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(config.first_client_id));
        let dispatcher = Arc::new(Dispatcher::new(registry.clone()));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        Self {
            config,
            registry,
            dispatcher,
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        self.registry.clone()
    }

    /// Handle used to stop a running server.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn run(self) -> RelayResult<()> {
        let (local_addr, connections) = websocket::start_listener(self.config.bind_addr).await?;
        info!(addr = %local_addr, "minedive-server ready");
        self.serve(connections).await
    }

    /// Serve connections from an already-started listener.
    ///
    /// Returns an error only when no client identity can be created
    /// (secure random source failure); the caller must not keep running.
    pub async fn serve(
        mut self,
        mut connections: mpsc::Receiver<WebSocketConnection>,
    ) -> RelayResult<()> {
        let limits = SessionLimits {
            max_message_size: self.config.max_message_size,
            outbound_queue: self.config.outbound_queue,
        };
        let mut sessions = JoinSet::new();

        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!("shutdown requested, closing sessions");
                    break;
                }
                Some(conn) = connections.recv() => {
                    let remote = conn.remote_addr;
                    let secret_key = match generate_secret_key() {
                        Ok(key) => key,
                        Err(e) => {
                            error!(remote = %remote, error = %e, "cannot create client identity");
                            return Err(e);
                        }
                    };
                    debug!(remote = %remote, "starting session");
                    let session = ConnectionSession::new(conn, secret_key, self.dispatcher.clone(), limits);
                    let session_shutdown = self.shutdown_tx.subscribe();
                    sessions.spawn(async move {
                        if let Err(e) = session.run(session_shutdown).await {
                            warn!(remote = %remote, error = %e, "session ended with error");
                        }
                    });
                }
                Some(_) = sessions.join_next(), if !sessions.is_empty() => {}
            }
        }

        let _ = self.shutdown_tx.send(());
        while sessions.join_next().await.is_some() {}
        self.registry.dump().await;
        info!("all sessions closed");
        Ok(())
    }
}
