//! Boardwalk replication layer.
//!
//! One participant (the host) runs the authoritative engine from
//! `boardwalk-core`; everyone else holds a read-mostly replica. This crate
//! supplies the plumbing between them:
//!
//! - [`transport`]: the backend-agnostic transport contract
//! - [`channel`]: direct-channel backend over WebSockets
//! - [`document`]: shared-document backend behind a store capability trait
//! - [`store`]: canonical state container and snapshot merge
//! - [`host`]: the serial action loop, broadcast, and inactivity watchdog
//! - [`client`]: replica session and the client action channel
//! - [`sink`]: presentation sink consuming the reducer's effect intents

pub mod channel;
pub mod client;
pub mod document;
pub mod host;
pub mod protocol;
pub mod sink;
pub mod store;
pub mod transport;

pub use channel::WsTransport;
pub use client::GameClient;
pub use document::{DocEvent, DocTransport, DocumentStore, MemoryStore, StoreError};
pub use host::{GameHost, HostConfig};
pub use protocol::{ActionRecord, Envelope, SnapshotDoc, WireAction};
pub use sink::{dispatch_effects, NullSink, PresentationSink, TracingSink};
pub use store::StateStore;
pub use transport::{ActionChannel, Incoming, SessionId, Transport, TransportError, HOST_PEER};
