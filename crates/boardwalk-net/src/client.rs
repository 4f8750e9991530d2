//! Client session: a read-mostly replica plus the action channel.
//!
//! A client never predicts: its own actions only take visible effect once
//! the host's resulting snapshot comes back and is merged into the store.

use crate::protocol::{Envelope, WireAction};
use crate::sink::PresentationSink;
use crate::store::StateStore;
use crate::transport::{ActionChannel, Incoming, SessionId, Transport, TransportError};
use boardwalk_core::{GameAction, GameSettings, GameState, Severity};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub struct GameClient {
    store: Mutex<StateStore>,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn PresentationSink>,
    host_peer: SessionId,
}

impl GameClient {
    /// Attach a client session to a connected transport.
    pub fn spawn(
        transport: Arc<dyn Transport>,
        incoming: mpsc::UnboundedReceiver<Incoming>,
        sink: Arc<dyn PresentationSink>,
        host_peer: SessionId,
        room_id: String,
        settings: GameSettings,
    ) -> Arc<Self> {
        let mut store = StateStore::new(settings);
        store.set_identity(transport.local_id());
        store.set_room(room_id);

        let client = Arc::new(Self {
            store: Mutex::new(store),
            transport,
            sink,
            host_peer,
        });
        Arc::clone(&client).spawn_pump(incoming);
        client
    }

    pub fn local_id(&self) -> SessionId {
        self.transport.local_id()
    }

    /// Read access to the replicated state.
    pub fn with_state<R>(&self, f: impl FnOnce(&GameState) -> R) -> R {
        let store = self.store.lock().expect("state store poisoned");
        f(store.state())
    }

    fn spawn_pump(self: Arc<Self>, mut incoming: mpsc::UnboundedReceiver<Incoming>) {
        tokio::spawn(async move {
            while let Some(event) = incoming.recv().await {
                match event {
                    Incoming::Message(_, Envelope::StateUpdate(state)) => {
                        debug!("snapshot received, merging");
                        let mut store = self.store.lock().expect("state store poisoned");
                        store.merge_snapshot(state);
                    }
                    Incoming::Message(peer, Envelope::Action(_)) => {
                        // Actions flow client to host, never the reverse.
                        warn!("unexpected action envelope from {}", peer);
                    }
                    Incoming::HostClosed => {
                        self.sink.notify("Host ended the session", Severity::Warning);
                        break;
                    }
                    Incoming::Disconnected(_) => {
                        self.sink.notify("Connection to host lost", Severity::Error);
                    }
                    Incoming::Connected(_) => {}
                }
            }
        });
    }
}

impl ActionChannel for GameClient {
    /// Serialize the intent and deliver it to the host. The engine state is
    /// unaffected by transport failures; the user just hears about them.
    fn request_action(&self, action: GameAction) -> Result<(), TransportError> {
        let wire = WireAction {
            from: self.transport.local_id(),
            action,
        };
        let result = self.transport.send(&self.host_peer, &Envelope::Action(wire));
        if let Err(ref e) = result {
            self.sink
                .notify(&format!("Could not reach the host: {}", e), Severity::Error);
        }
        result
    }
}
