//! Shared-document transport backend.
//!
//! The host writes the full state snapshot to a keyed document on every
//! broadcast; clients subscribe to change notifications on that document.
//! Client actions land as discrete records under the room's namespace and
//! the host consumes-and-deletes each one (at-least-once delivery; a crash
//! between apply and delete can replay a record). Document deletion means
//! "host ended the session", distinct from "room never existed"; a client
//! can only claim the latter before its first successful read.
//!
//! The concrete store SDK stays behind the [`DocumentStore`] capability
//! trait; [`MemoryStore`] is the in-process implementation used for local
//! play and tests.

use crate::protocol::{now_ms, ActionRecord, Envelope, SnapshotDoc};
use crate::transport::{Incoming, SessionId, Transport, TransportError, HOST_PEER};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document write rejected: {0}")]
    WriteRejected(String),

    #[error("document read failed: {0}")]
    ReadFailed(String),
}

/// Change notification on a room document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocEvent {
    Updated,
    Deleted,
}

/// Capability interface over the shared-document service.
pub trait DocumentStore: Send + Sync + 'static {
    fn put_snapshot(&self, room: &str, doc: SnapshotDoc) -> Result<(), StoreError>;
    fn get_snapshot(&self, room: &str) -> Result<Option<SnapshotDoc>, StoreError>;
    /// Remove the room document and any queued action records.
    fn delete_room(&self, room: &str) -> Result<(), StoreError>;
    fn push_action(&self, room: &str, record: ActionRecord) -> Result<(), StoreError>;
    /// Drain pending action records; the store deletes what it hands out.
    fn take_actions(&self, room: &str) -> Result<Vec<ActionRecord>, StoreError>;
    /// Subscribe to change notifications for a room.
    fn watch(&self, room: &str) -> broadcast::Receiver<DocEvent>;
}

/// In-process document store.
#[derive(Default)]
pub struct MemoryStore {
    snapshots: DashMap<String, SnapshotDoc>,
    actions: DashMap<String, Vec<ActionRecord>>,
    watchers: DashMap<String, broadcast::Sender<DocEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn notify(&self, room: &str, event: DocEvent) {
        if let Some(sender) = self.watchers.get(room) {
            let _ = sender.send(event);
        }
    }
}

impl DocumentStore for MemoryStore {
    fn put_snapshot(&self, room: &str, doc: SnapshotDoc) -> Result<(), StoreError> {
        self.snapshots.insert(room.to_string(), doc);
        self.notify(room, DocEvent::Updated);
        Ok(())
    }

    fn get_snapshot(&self, room: &str) -> Result<Option<SnapshotDoc>, StoreError> {
        Ok(self.snapshots.get(room).map(|doc| doc.clone()))
    }

    fn delete_room(&self, room: &str) -> Result<(), StoreError> {
        self.snapshots.remove(room);
        self.actions.remove(room);
        self.notify(room, DocEvent::Deleted);
        Ok(())
    }

    fn push_action(&self, room: &str, record: ActionRecord) -> Result<(), StoreError> {
        self.actions.entry(room.to_string()).or_default().push(record);
        Ok(())
    }

    fn take_actions(&self, room: &str) -> Result<Vec<ActionRecord>, StoreError> {
        Ok(self
            .actions
            .get_mut(room)
            .map(|mut queue| std::mem::take(queue.value_mut()))
            .unwrap_or_default())
    }

    fn watch(&self, room: &str) -> broadcast::Receiver<DocEvent> {
        self.watchers
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(64).0)
            .subscribe()
    }
}

/// Which end of the document transport this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Host,
    Client,
}

/// Transport adapter over a [`DocumentStore`].
pub struct DocTransport {
    local_id: SessionId,
    room: String,
    store: Arc<dyn DocumentStore>,
    role: Role,
    closed: AtomicBool,
    /// Peer sessions observed through their action records (host side).
    seen_peers: DashMap<SessionId, ()>,
}

impl DocTransport {
    /// Host end: poll the room's action records, consuming each exactly
    /// once per drain. The host never subscribes to its own snapshot
    /// writes, so its broadcasts cannot echo back as input.
    pub fn host(
        store: Arc<dyn DocumentStore>,
        room: &str,
        poll_interval: Duration,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<Incoming>) {
        let transport = Arc::new(Self {
            local_id: Uuid::new_v4().to_string(),
            room: room.to_string(),
            store,
            role: Role::Host,
            closed: AtomicBool::new(false),
            seen_peers: DashMap::new(),
        });
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();

        let poller = Arc::clone(&transport);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                ticker.tick().await;
                if poller.closed.load(Ordering::Relaxed) {
                    break;
                }
                match poller.store.take_actions(&poller.room) {
                    Ok(records) => {
                        for record in records {
                            let from = record.action.from.clone();
                            if poller.seen_peers.insert(from.clone(), ()).is_none() {
                                let _ = incoming_tx.send(Incoming::Connected(from.clone()));
                            }
                            let _ = incoming_tx
                                .send(Incoming::Message(from, Envelope::Action(record.action)));
                        }
                    }
                    Err(e) => warn!("action poll failed: {}", e),
                }
            }
        });

        (transport, incoming_rx)
    }

    /// Client end: read the current snapshot, then follow change
    /// notifications. A missing document at this point means the room
    /// never existed; a deletion later means the host ended the session.
    pub fn connect(
        store: Arc<dyn DocumentStore>,
        room: &str,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<Incoming>), TransportError> {
        let initial = store
            .get_snapshot(room)
            .map_err(|e| TransportError::SendFailed(e.to_string()))?
            .ok_or_else(|| TransportError::RoomNotFound(room.to_string()))?;

        let transport = Arc::new(Self {
            local_id: Uuid::new_v4().to_string(),
            room: room.to_string(),
            store,
            role: Role::Client,
            closed: AtomicBool::new(false),
            seen_peers: DashMap::new(),
        });
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        let _ = incoming_tx.send(Incoming::Message(
            HOST_PEER.to_string(),
            Envelope::StateUpdate(initial.state),
        ));

        let watcher = Arc::clone(&transport);
        let mut events = watcher.store.watch(room);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(DocEvent::Updated) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        // Re-read on every signal; missed notifications
                        // collapse into one read of the latest snapshot.
                        match watcher.store.get_snapshot(&watcher.room) {
                            Ok(Some(doc)) => {
                                let _ = incoming_tx.send(Incoming::Message(
                                    HOST_PEER.to_string(),
                                    Envelope::StateUpdate(doc.state),
                                ));
                            }
                            Ok(None) => {}
                            Err(e) => warn!("snapshot read failed: {}", e),
                        }
                    }
                    Ok(DocEvent::Deleted) => {
                        debug!("room {} deleted by host", watcher.room);
                        let _ = incoming_tx.send(Incoming::HostClosed);
                        break;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                if watcher.closed.load(Ordering::Relaxed) {
                    break;
                }
            }
        });

        Ok((transport, incoming_rx))
    }
}

impl Transport for DocTransport {
    fn local_id(&self) -> SessionId {
        self.local_id.clone()
    }

    fn send(&self, _peer: &str, msg: &Envelope) -> Result<(), TransportError> {
        match (self.role, msg) {
            // Client intents become discrete records under the room.
            (Role::Client, Envelope::Action(action)) => self
                .store
                .push_action(&self.room, ActionRecord::new(action.clone()))
                .map_err(|e| TransportError::SendFailed(e.to_string())),
            // The shared document has no per-peer lane: host-side sends
            // degenerate to a snapshot write that everyone observes.
            (Role::Host, Envelope::StateUpdate(_)) => self.broadcast(msg),
            _ => Err(TransportError::SendFailed(
                "envelope not valid for this role".to_string(),
            )),
        }
    }

    fn broadcast(&self, msg: &Envelope) -> Result<(), TransportError> {
        let Envelope::StateUpdate(state) = msg else {
            return Err(TransportError::SendFailed(
                "only state updates are broadcast".to_string(),
            ));
        };
        self.store
            .put_snapshot(
                &self.room,
                SnapshotDoc {
                    state: state.clone(),
                    updated_at: now_ms(),
                },
            )
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    fn peers(&self) -> Vec<SessionId> {
        self.seen_peers
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    fn disconnect(&self, peer: &str) {
        self.seen_peers.remove(peer);
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
        if self.role == Role::Host {
            if let Err(e) = self.store.delete_room(&self.room) {
                warn!("failed to delete room {}: {}", self.room, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardwalk_core::{GameAction, GameSettings, GameState};
    use crate::protocol::WireAction;

    fn snapshot_doc() -> SnapshotDoc {
        SnapshotDoc {
            state: GameState::new(GameSettings::default()),
            updated_at: 1,
        }
    }

    fn roll_record(from: &str) -> ActionRecord {
        ActionRecord::new(WireAction {
            from: from.to_string(),
            action: GameAction::RollDice,
        })
    }

    #[test]
    fn test_memory_store_snapshot_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.get_snapshot("r1").unwrap().is_none());

        store.put_snapshot("r1", snapshot_doc()).unwrap();
        assert!(store.get_snapshot("r1").unwrap().is_some());

        store.delete_room("r1").unwrap();
        assert!(store.get_snapshot("r1").unwrap().is_none());
    }

    #[test]
    fn test_take_actions_drains_exactly_once() {
        let store = MemoryStore::new();
        store.push_action("r1", roll_record("a")).unwrap();
        store.push_action("r1", roll_record("b")).unwrap();

        let first = store.take_actions("r1").unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].action.from, "a");
        assert_eq!(first[1].action.from, "b");

        // Consumed records are gone.
        assert!(store.take_actions("r1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_watch_signals_update_and_delete() {
        let store = MemoryStore::new();
        let mut events = store.watch("r1");

        store.put_snapshot("r1", snapshot_doc()).unwrap();
        assert_eq!(events.recv().await.unwrap(), DocEvent::Updated);

        store.delete_room("r1").unwrap();
        assert_eq!(events.recv().await.unwrap(), DocEvent::Deleted);
    }

    #[tokio::test]
    async fn test_connect_to_missing_room_fails() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let result = DocTransport::connect(store, "nowhere");
        assert!(matches!(result, Err(TransportError::RoomNotFound(_))));
    }

    #[tokio::test]
    async fn test_client_sees_initial_snapshot_then_host_close() {
        let memory = Arc::new(MemoryStore::new());
        memory.put_snapshot("r1", snapshot_doc()).unwrap();

        let store: Arc<dyn DocumentStore> = memory.clone();
        let (_transport, mut incoming) = DocTransport::connect(store, "r1").unwrap();

        match incoming.recv().await.unwrap() {
            Incoming::Message(_, Envelope::StateUpdate(state)) => {
                assert_eq!(state.board.len(), 40);
            }
            other => panic!("expected initial snapshot, got {other:?}"),
        }

        memory.delete_room("r1").unwrap();
        loop {
            match incoming.recv().await.unwrap() {
                Incoming::HostClosed => break,
                Incoming::Message(..) => continue,
                other => panic!("expected host close, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_host_polls_and_consumes_action_records() {
        let memory = Arc::new(MemoryStore::new());
        let store: Arc<dyn DocumentStore> = memory.clone();
        let (transport, mut incoming) =
            DocTransport::host(store, "r1", Duration::from_millis(5));

        memory.push_action("r1", roll_record("peer-9")).unwrap();

        // First the peer registers, then its action arrives.
        match incoming.recv().await.unwrap() {
            Incoming::Connected(peer) => assert_eq!(peer, "peer-9"),
            other => panic!("expected connect, got {other:?}"),
        }
        match incoming.recv().await.unwrap() {
            Incoming::Message(peer, Envelope::Action(wire)) => {
                assert_eq!(peer, "peer-9");
                assert_eq!(wire.action, GameAction::RollDice);
            }
            other => panic!("expected action, got {other:?}"),
        }

        assert_eq!(transport.peers(), vec!["peer-9".to_string()]);
        assert!(memory.take_actions("r1").unwrap().is_empty());
    }
}
