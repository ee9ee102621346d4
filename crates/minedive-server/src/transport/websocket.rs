//! WebSocket listener using tokio-tungstenite.
//!
//! Accepts TCP connections, performs the WebSocket upgrade in a background
//! task per connection, and hands finished connections to the server.

use futures_util::{SinkExt, StreamExt};
use minedive_core::{RelayError, RelayResult};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};

/// A handle to an accepted WebSocket connection.
pub struct WebSocketConnection {
    pub ws_stream: WebSocketStream<TcpStream>,
    pub remote_addr: SocketAddr,
}

/// Bind `bind_addr` and start accepting WebSocket connections.
///
/// Returns the bound address (useful with port 0) and a receiver that
/// yields upgraded connections.
pub async fn start_listener(
    bind_addr: SocketAddr,
) -> RelayResult<(SocketAddr, mpsc::Receiver<WebSocketConnection>)> {
    let tcp_listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| RelayError::Transport(format!("WS bind failed: {e}")))?;
    let local_addr = tcp_listener.local_addr()?;

    info!(addr = %local_addr, "WebSocket listener started");

    let (tx, rx) = mpsc::channel::<WebSocketConnection>(64);

    tokio::spawn(async move {
        loop {
            match tcp_listener.accept().await {
                Ok((stream, addr)) => {
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        match tokio_tungstenite::accept_async(stream).await {
                            Ok(ws_stream) => {
                                debug!(remote = %addr, "WebSocket connection accepted");
                                let conn = WebSocketConnection {
                                    ws_stream,
                                    remote_addr: addr,
                                };
                                if tx.send(conn).await.is_err() {
                                    warn!("WebSocket connection channel closed");
                                }
                            }
                            Err(e) => {
                                warn!(remote = %addr, error = %e, "WebSocket handshake failed");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "TCP accept failed");
                }
            }
            if tx.is_closed() {
                debug!("server stopped accepting, closing listener");
                break;
            }
        }
    });

    Ok((local_addr, rx))
}

/// Send one text frame.
pub async fn ws_send_text(ws: &mut WebSocketStream<TcpStream>, text: String) -> RelayResult<()> {
    ws.send(Message::Text(text.into()))
        .await
        .map_err(|e| RelayError::Transport(format!("WS send failed: {e}")))
}

/// Receive the next JSON frame as text.
///
/// Returns `None` once the peer closes. Binary frames are accepted if they
/// hold UTF-8; frames over `max_size` bytes or with invalid UTF-8 are
/// dropped with a warning. Pings are answered in place.
pub async fn ws_recv_text(
    ws: &mut WebSocketStream<TcpStream>,
    max_size: usize,
) -> RelayResult<Option<String>> {
    loop {
        let data = match ws.next().await {
            Some(Ok(Message::Text(text))) => text.as_bytes().to_vec(),
            Some(Ok(Message::Binary(data))) => data.to_vec(),
            Some(Ok(Message::Close(_))) => return Ok(None),
            Some(Ok(Message::Ping(payload))) => {
                let _ = ws.send(Message::Pong(payload)).await;
                continue;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                return Err(RelayError::Transport(format!("WS recv failed: {e}")));
            }
            None => return Ok(None),
        };

        if data.len() > max_size {
            warn!(size = data.len(), max = max_size, "dropping oversized frame");
            continue;
        }
        match String::from_utf8(data) {
            Ok(text) => return Ok(Some(text)),
            Err(_) => warn!("dropping frame that is not UTF-8"),
        }
    }
}
