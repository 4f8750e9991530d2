//! Transport adapter contract shared by both backends.
//!
//! The engine and action channel never branch on which backend is active:
//! they hold an `Arc<dyn Transport>` for outbound traffic and consume a
//! single [`Incoming`] event stream for inbound traffic. Sends are
//! non-blocking enqueues drained by background tasks; every failure is
//! non-fatal for the host's own game.

use crate::protocol::Envelope;
use boardwalk_core::GameAction;
use thiserror::Error;

/// Transport-session identifier. Distinct from the logical player id: a
/// player may reconnect under a new session id.
pub type SessionId = String;

/// Key a client uses to address the host before it learns a real id.
pub const HOST_PEER: &str = "host";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection attempt timed out")]
    ConnectTimeout,

    #[error("peer unavailable: {0}")]
    PeerUnavailable(String),

    #[error("not connected")]
    NotConnected,

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("room not found: {0}")]
    RoomNotFound(String),

    #[error("transport closed")]
    Closed,
}

/// Connection-level events delivered to the state/engine layer.
#[derive(Debug)]
pub enum Incoming {
    /// A peer session opened (host side).
    Connected(SessionId),
    /// A decoded envelope arrived from a peer.
    Message(SessionId, Envelope),
    /// A peer session closed (host side).
    Disconnected(SessionId),
    /// The host tore the session down: socket closed from the host end, or
    /// the room document was deleted after this client had observed it.
    HostClosed,
}

/// Outbound half of a transport backend.
pub trait Transport: Send + Sync {
    /// This participant's own session id.
    fn local_id(&self) -> SessionId;

    /// Deliver an envelope to one peer session.
    fn send(&self, peer: &str, msg: &Envelope) -> Result<(), TransportError>;

    /// Fan an envelope out to every known peer session (host only).
    fn broadcast(&self, msg: &Envelope) -> Result<(), TransportError>;

    /// Currently known peer sessions.
    fn peers(&self) -> Vec<SessionId>;

    /// Drop a single peer session.
    fn disconnect(&self, peer: &str);

    /// Tear the transport down. On the document backend this deletes the
    /// room document, signalling "host ended the session" to subscribers.
    fn close(&self);
}

/// The action channel: submit an intent for exactly-once application by
/// the authority. Host implementations short-circuit into the reducer;
/// client implementations serialize and deliver to the host.
pub trait ActionChannel {
    fn request_action(&self, action: GameAction) -> Result<(), TransportError>;
}
