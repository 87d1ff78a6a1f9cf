//! Websocket listener and dialer for peer sessions
//!
//! Every session, inbound or outbound, runs the same way: a reader loop that
//! hands text frames to the node, and a writer task draining the session's
//! outbound queue with a bounded send timeout.

use crate::error::TransportError;
use crate::node::Node;
use crate::sessions::SessionId;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, connect_async, tungstenite::Message, WebSocketStream};

/// Peer-protocol listener
pub struct PeerServer {
    node: Arc<Node>,
}

impl PeerServer {
    pub fn new(node: Arc<Node>) -> Self {
        Self { node }
    }

    /// Bind `addr` and accept peer sessions in the background
    pub async fn start(&self, addr: &str) -> anyhow::Result<SocketAddr> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Peer server listening on {}", local_addr);

        let node = self.node.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer_addr)) => {
                        tracing::info!("Peer connected from {}", peer_addr);
                        let node = node.clone();
                        tokio::spawn(async move {
                            if let Err(e) = accept_peer(node, stream, peer_addr).await {
                                tracing::warn!("Peer handshake from {} failed: {}", peer_addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!("Accept error: {}", e);
                    }
                }
            }
        });

        Ok(local_addr)
    }
}

async fn accept_peer(
    node: Arc<Node>,
    stream: TcpStream,
    peer_addr: SocketAddr,
) -> Result<SessionId, TransportError> {
    let limit = node.config().connect_timeout_ms;
    let ws_stream = timeout(Duration::from_millis(limit), accept_async(stream))
        .await
        .map_err(|_| TransportError::Timeout(limit))??;
    Ok(attach(node, ws_stream, peer_addr.to_string()))
}

/// Dial a peer and open a session with it
///
/// `addr` may be a bare `host:port` or a full `ws://` URL.
pub async fn connect(node: Arc<Node>, addr: &str) -> Result<SessionId, TransportError> {
    let url = if addr.contains("://") {
        addr.to_string()
    } else {
        format!("ws://{}", addr)
    };
    tracing::debug!("Dialing peer {}", url);

    let limit = node.config().connect_timeout_ms;
    let (ws_stream, _) = timeout(Duration::from_millis(limit), connect_async(url.as_str()))
        .await
        .map_err(|_| TransportError::Timeout(limit))?
        .map_err(|e| TransportError::Connect {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;

    tracing::info!("Connected to peer at {}", addr);
    Ok(attach(node, ws_stream, addr.to_string()))
}

/// Register an open websocket with the node and spawn its session driver
fn attach<S>(node: Arc<Node>, ws_stream: WebSocketStream<S>, addr: String) -> SessionId
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (ws_sender, ws_receiver) = ws_stream.split();
    let (tx, rx) = mpsc::channel::<String>(node.config().outbound_queue_len.max(1));
    let id = node.open_session(addr, tx);
    let send_timeout = Duration::from_millis(node.config().send_timeout_ms);

    tokio::spawn(async move {
        let mut writer = tokio::spawn(write_loop(id, ws_sender, rx, send_timeout));

        tokio::select! {
            _ = read_loop(&node, id, ws_receiver) => {}
            _ = &mut writer => {}
        }

        writer.abort();
        node.close_session(id);
    });

    id
}

async fn read_loop<S>(node: &Node, id: SessionId, mut ws_receiver: SplitStream<WebSocketStream<S>>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                // Malformed frames are logged inside and dropped
                let _ = node.handle_text(id, &text);
            }
            Ok(Message::Close(_)) => {
                tracing::info!("Peer closed session {}", id);
                break;
            }
            Err(e) => {
                tracing::warn!("WebSocket error on session {}: {}", id, e);
                break;
            }
            _ => {}
        }
    }
}

async fn write_loop<S>(
    id: SessionId,
    mut ws_sender: SplitSink<WebSocketStream<S>, Message>,
    mut rx: mpsc::Receiver<String>,
    send_timeout: Duration,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(text) = rx.recv().await {
        match timeout(send_timeout, ws_sender.send(Message::Text(text))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!("Send on session {} failed: {}", id, e);
                break;
            }
            Err(_) => {
                tracing::warn!(
                    "Send on session {} timed out after {}ms",
                    id,
                    send_timeout.as_millis()
                );
                break;
            }
        }
    }

    // Queue dropped means the session was closed on our side
    let _ = ws_sender.close().await;
}
