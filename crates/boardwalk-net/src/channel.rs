//! Direct-channel transport backend over WebSockets.
//!
//! The host accepts one bidirectional connection per peer and tracks them
//! in a registry keyed by session id. Clients dial the host with a bounded
//! connect timeout; a timeout is reported distinctly from an unreachable
//! peer.

use crate::protocol::Envelope;
use crate::transport::{Incoming, SessionId, Transport, TransportError, HOST_PEER};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, connect_async, tungstenite::Message};
use tracing::{error, info, warn};
use uuid::Uuid;

/// WebSocket transport; one instance per participant.
pub struct WsTransport {
    local_id: SessionId,
    /// Host: every connected client. Client: a single link to the host.
    links: DashMap<SessionId, mpsc::UnboundedSender<Message>>,
}

impl WsTransport {
    /// Bind a listening socket and accept peer connections (host side).
    pub async fn host(
        addr: SocketAddr,
    ) -> anyhow::Result<(Arc<Self>, mpsc::UnboundedReceiver<Incoming>)> {
        let listener = TcpListener::bind(addr).await?;
        let transport = Arc::new(Self {
            local_id: Uuid::new_v4().to_string(),
            links: DashMap::new(),
        });
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();

        let accept_transport = Arc::clone(&transport);
        tokio::spawn(async move {
            while let Ok((stream, peer_addr)) = listener.accept().await {
                let transport = Arc::clone(&accept_transport);
                let incoming_tx = incoming_tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = accept_peer(stream, peer_addr, transport, incoming_tx).await {
                        warn!("connection error from {}: {}", peer_addr, e);
                    }
                });
            }
        });

        Ok((transport, incoming_rx))
    }

    /// Dial a host (client side). The attempt is bounded by
    /// `connect_timeout`; afterwards the host is addressable as
    /// [`HOST_PEER`].
    pub async fn connect(
        url: &str,
        connect_timeout: Duration,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<Incoming>), TransportError> {
        let (ws_stream, _) = match tokio::time::timeout(connect_timeout, connect_async(url)).await {
            Err(_) => return Err(TransportError::ConnectTimeout),
            Ok(Err(e)) => return Err(TransportError::PeerUnavailable(e.to_string())),
            Ok(Ok(ok)) => ok,
        };
        info!("connected to host at {}", url);

        let transport = Arc::new(Self {
            local_id: Uuid::new_v4().to_string(),
            links: DashMap::new(),
        });
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        transport.links.insert(HOST_PEER.to_string(), tx);

        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if ws_sender.send(msg).await.is_err() {
                    break;
                }
            }
        });

        let reader_transport = Arc::clone(&transport);
        tokio::spawn(async move {
            while let Some(msg) = ws_receiver.next().await {
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<Envelope>(&text) {
                        Ok(envelope) => {
                            let _ = incoming_tx
                                .send(Incoming::Message(HOST_PEER.to_string(), envelope));
                        }
                        Err(e) => warn!("invalid message from host: {}", e),
                    },
                    Ok(Message::Close(_)) => break,
                    Err(e) => {
                        error!("websocket error from host: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
            reader_transport.links.remove(HOST_PEER);
            let _ = incoming_tx.send(Incoming::HostClosed);
        });

        Ok((transport, incoming_rx))
    }
}

/// Handle a single accepted peer connection on the host.
async fn accept_peer(
    stream: TcpStream,
    addr: SocketAddr,
    transport: Arc<WsTransport>,
    incoming_tx: mpsc::UnboundedSender<Incoming>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    let session_id = Uuid::new_v4().to_string();
    info!("peer {} connected from {}", session_id, addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // A reconnecting browser shows up as a brand new session; the engine's
    // rejoin-by-uid rule re-attaches it to its seat.
    transport.links.insert(session_id.clone(), tx);
    let _ = incoming_tx.send(Incoming::Connected(session_id.clone()));

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<Envelope>(&text) {
                Ok(envelope) => {
                    let _ = incoming_tx.send(Incoming::Message(session_id.clone(), envelope));
                }
                Err(e) => warn!("invalid message from {}: {}", session_id, e),
            },
            Ok(Message::Close(_)) => {
                info!("peer {} closing connection", session_id);
                break;
            }
            Err(e) => {
                error!("websocket error from {}: {}", session_id, e);
                break;
            }
            _ => {}
        }
    }

    transport.links.remove(&session_id);
    let _ = incoming_tx.send(Incoming::Disconnected(session_id.clone()));
    send_task.abort();

    info!("peer {} disconnected", session_id);
    Ok(())
}

impl Transport for WsTransport {
    fn local_id(&self) -> SessionId {
        self.local_id.clone()
    }

    fn send(&self, peer: &str, msg: &Envelope) -> Result<(), TransportError> {
        let text =
            serde_json::to_string(msg).map_err(|e| TransportError::SendFailed(e.to_string()))?;
        let link = self
            .links
            .get(peer)
            .ok_or_else(|| TransportError::PeerUnavailable(peer.to_string()))?;
        link.send(Message::Text(text.into()))
            .map_err(|_| TransportError::NotConnected)
    }

    fn broadcast(&self, msg: &Envelope) -> Result<(), TransportError> {
        let text =
            serde_json::to_string(msg).map_err(|e| TransportError::SendFailed(e.to_string()))?;
        for link in self.links.iter() {
            if link.value().send(Message::Text(text.clone().into())).is_err() {
                // The reader task reaps dead links; just note it here.
                warn!("skipping dead link to {}", link.key());
            }
        }
        Ok(())
    }

    fn peers(&self) -> Vec<SessionId> {
        self.links.iter().map(|entry| entry.key().clone()).collect()
    }

    fn disconnect(&self, peer: &str) {
        self.links.remove(peer);
    }

    fn close(&self) {
        self.links.clear();
    }
}
