//! Connection session: the per-connection control loop.
//!
//! Lifecycle: the accepted socket gets a `Client`, the client is registered
//! and told its id, then the loop alternates between inbound frames and the
//! client's outbound queue until the socket closes. The loop is the only
//! writer to the socket. On exit the client is always unregistered.

use super::client::Client;
use crate::dispatch::Dispatcher;
use crate::transport::websocket::{self, WebSocketConnection};
use minedive_core::{encode_server_message, RelayResult, SecretKey, ServerMessage};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info};

/// Limits applied to every session.
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    /// Largest inbound frame accepted, in bytes.
    pub max_message_size: usize,
    /// Capacity of each client's outbound queue.
    pub outbound_queue: usize,
}

/// One accepted connection and its client.
pub struct ConnectionSession {
    client: Arc<Client>,
    ws: WebSocketStream<TcpStream>,
    outbound_rx: mpsc::Receiver<String>,
    dispatcher: Arc<Dispatcher>,
    max_message_size: usize,
}

impl ConnectionSession {
    /// Build the session for an accepted connection.
    ///
    /// The secret key is generated by the caller so that an entropy failure
    /// can stop the whole server rather than one connection.
    pub fn new(
        conn: WebSocketConnection,
        secret_key: SecretKey,
        dispatcher: Arc<Dispatcher>,
        limits: SessionLimits,
    ) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(limits.outbound_queue);
        let client = Arc::new(Client::new(
            conn.remote_addr.to_string(),
            secret_key,
            outbound_tx,
        ));
        Self {
            client,
            ws: conn.ws_stream,
            outbound_rx,
            dispatcher,
            max_message_size: limits.max_message_size,
        }
    }

    /// Register, announce the id, and run until the connection ends.
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) -> RelayResult<()> {
        let registry = self.dispatcher.registry().clone();
        let id = registry.register(self.client.clone()).await?;

        let result = self.serve(id, &mut shutdown_rx).await;

        registry.unregister(id).await;
        info!(client_id = id, remote = %self.client.remote_addr(), "client disconnected");
        result
    }

    async fn serve(&mut self, id: u64, shutdown_rx: &mut broadcast::Receiver<()>) -> RelayResult<()> {
        let announce = encode_server_message(&ServerMessage::Id { id })?;
        websocket::ws_send_text(&mut self.ws, announce).await?;

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!(client_id = id, "shutdown signal received, closing connection");
                    let _ = self.ws.close(None).await;
                    break;
                }

                Some(frame) = self.outbound_rx.recv() => {
                    websocket::ws_send_text(&mut self.ws, frame).await?;
                }

                inbound = websocket::ws_recv_text(&mut self.ws, self.max_message_size) => {
                    match inbound? {
                        Some(frame) => {
                            if let Some(reply) = self.dispatcher.dispatch(&self.client, &frame).await {
                                let text = encode_server_message(&reply)?;
                                websocket::ws_send_text(&mut self.ws, text).await?;
                            }
                        }
                        None => {
                            debug!(client_id = id, "connection closed by peer");
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
