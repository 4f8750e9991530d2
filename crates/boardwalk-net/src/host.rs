//! The host service: the one writer.
//!
//! All intents, local or remote, funnel into a single queue consumed by
//! one task, so actions apply serially in arrival order with no reentrancy.
//! Each application validates, mutates, dispatches effects, and broadcasts;
//! broadcast and persistence failures degrade to log lines, never into the
//! reducer.

use crate::protocol::{now_ms, Envelope, WireAction};
use crate::sink::{dispatch_effects, PresentationSink};
use crate::store::StateStore;
use crate::transport::{ActionChannel, Incoming, SessionId, Transport, TransportError};
use boardwalk_core::{GameAction, GameSettings, GameState, GameStatus, Severity, MAX_LOG_ENTRIES};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct HostConfig {
    pub room_id: String,
    pub settings: GameSettings,
    /// Idle time after which the game is force-closed.
    pub inactivity_timeout: Duration,
    /// How often the watchdog compares "now" against `last_activity`.
    pub sweep_interval: Duration,
    /// Delay between the closing broadcast and the actual teardown.
    pub teardown_grace: Duration,
    pub muted: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            room_id: "boardwalk".to_string(),
            settings: GameSettings::default(),
            inactivity_timeout: Duration::from_secs(10 * 60),
            sweep_interval: Duration::from_secs(60),
            teardown_grace: Duration::from_secs(3),
            muted: false,
        }
    }
}

pub struct GameHost {
    store: Mutex<StateStore>,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn PresentationSink>,
    actions_tx: mpsc::UnboundedSender<WireAction>,
    muted: bool,
}

impl GameHost {
    /// Wire a host onto a transport and start its service tasks.
    pub fn spawn(
        transport: Arc<dyn Transport>,
        incoming: mpsc::UnboundedReceiver<Incoming>,
        sink: Arc<dyn PresentationSink>,
        config: HostConfig,
    ) -> Arc<Self> {
        let mut store = StateStore::new(config.settings.clone());
        store.set_identity(transport.local_id());
        store.set_room(config.room_id.clone());
        store.state_mut().touch(now_ms());

        let (actions_tx, actions_rx) = mpsc::unbounded_channel();
        let host = Arc::new(Self {
            store: Mutex::new(store),
            transport,
            sink,
            actions_tx,
            muted: config.muted,
        });

        // Publish the lobby right away; on the document backend this
        // creates the room document clients look for.
        host.broadcast_snapshot();

        Arc::clone(&host).spawn_transport_pump(incoming);
        Arc::clone(&host).spawn_action_loop(actions_rx, config.teardown_grace);
        Arc::clone(&host).spawn_watchdog(config);
        host
    }

    pub fn local_id(&self) -> SessionId {
        self.transport.local_id()
    }

    /// Read access to the authoritative state.
    pub fn with_state<R>(&self, f: impl FnOnce(&GameState) -> R) -> R {
        let store = self.store.lock().expect("state store poisoned");
        f(store.state())
    }

    /// Enqueue an action on behalf of a participant.
    pub fn submit(&self, from: &str, action: GameAction) {
        let _ = self.actions_tx.send(WireAction {
            from: from.to_string(),
            action,
        });
    }

    fn spawn_transport_pump(self: Arc<Self>, mut incoming: mpsc::UnboundedReceiver<Incoming>) {
        tokio::spawn(async move {
            while let Some(event) = incoming.recv().await {
                match event {
                    Incoming::Connected(peer) => {
                        info!("peer {} connected, sending current state", peer);
                        let snapshot = {
                            let store = self.store.lock().expect("state store poisoned");
                            store.snapshot()
                        };
                        if let Err(e) = self.transport.send(&peer, &Envelope::StateUpdate(snapshot))
                        {
                            warn!("failed to send state to {}: {}", peer, e);
                        }
                    }
                    Incoming::Message(peer, Envelope::Action(action)) => {
                        if action.from != peer {
                            debug!("action from {} stamped as {}", peer, action.from);
                        }
                        let _ = self.actions_tx.send(action);
                    }
                    Incoming::Message(peer, Envelope::StateUpdate(_)) => {
                        // Only the host publishes state; clients never do.
                        warn!("ignoring state update from client {}", peer);
                    }
                    Incoming::Disconnected(peer) => {
                        info!("peer {} disconnected", peer);
                    }
                    Incoming::HostClosed => break,
                }
            }
        });
    }

    fn spawn_action_loop(
        self: Arc<Self>,
        mut actions_rx: mpsc::UnboundedReceiver<WireAction>,
        teardown_grace: Duration,
    ) {
        tokio::spawn(async move {
            // Single consumer: actions apply serially, in arrival order.
            while let Some(wire) = actions_rx.recv().await {
                if self.process(wire) {
                    // Explicit close: grace delay, reset, drop the room.
                    tokio::time::sleep(teardown_grace).await;
                    {
                        let mut store = self.store.lock().expect("state store poisoned");
                        store.state_mut().reset();
                    }
                    self.transport.close();
                }
            }
        });
    }

    /// Apply one action. Returns true when the host player explicitly
    /// ended the game and the session should be torn down.
    fn process(&self, wire: WireAction) -> bool {
        let explicit_close = matches!(wire.action, GameAction::EndGame);
        let snapshot = {
            let mut store = self.store.lock().expect("state store poisoned");
            match store.state_mut().apply_action(&wire.from, wire.action) {
                Ok(effects) => {
                    store.state_mut().touch(now_ms());
                    dispatch_effects(self.sink.as_ref(), &effects, self.muted);
                    Some(store.snapshot())
                }
                Err(err) => {
                    // Validation rejection: state untouched, surface locally.
                    debug!("rejected action from {}: {}", wire.from, err);
                    self.sink.notify(&err.to_string(), Severity::Warning);
                    None
                }
            }
        };

        match snapshot {
            Some(snapshot) => {
                self.broadcast_state(snapshot);
                explicit_close
            }
            None => false,
        }
    }

    fn broadcast_snapshot(&self) {
        let snapshot = {
            let store = self.store.lock().expect("state store poisoned");
            store.snapshot()
        };
        self.broadcast_state(snapshot);
    }

    fn broadcast_state(&self, snapshot: GameState) {
        // Non-fatal by contract: the host's own game plays on.
        if let Err(e) = self.transport.broadcast(&Envelope::StateUpdate(snapshot)) {
            warn!("broadcast failed: {}", e);
        }
    }

    fn spawn_watchdog(self: Arc<Self>, config: HostConfig) {
        tokio::spawn(async move {
            let threshold_ms = config.inactivity_timeout.as_millis() as u64;
            let mut ticker = tokio::time::interval(config.sweep_interval);
            loop {
                ticker.tick().await;
                let idle = {
                    let store = self.store.lock().expect("state store poisoned");
                    store.state().is_inactive(now_ms(), threshold_ms)
                };
                if idle {
                    self.force_close(&config).await;
                }
            }
        });
    }

    /// Inactivity teardown: closing broadcast, grace delay, reset, and
    /// transport close (which deletes the persisted room document).
    async fn force_close(&self, config: &HostConfig) {
        warn!("game idle past {:?}, closing", config.inactivity_timeout);
        let snapshot = {
            let mut store = self.store.lock().expect("state store poisoned");
            let state = store.state_mut();
            state.status = GameStatus::GameOver;
            state
                .last_action_log
                .insert(0, "Game closed after inactivity".to_string());
            state.last_action_log.truncate(MAX_LOG_ENTRIES);
            store.snapshot()
        };
        self.sink
            .notify("Game closed after inactivity", Severity::Warning);
        self.broadcast_state(snapshot);

        tokio::time::sleep(config.teardown_grace).await;

        {
            let mut store = self.store.lock().expect("state store poisoned");
            store.state_mut().reset();
        }
        self.transport.close();
    }
}

impl ActionChannel for GameHost {
    /// The host's own intents short-circuit into the serial reducer queue.
    fn request_action(&self, action: GameAction) -> Result<(), TransportError> {
        self.actions_tx
            .send(WireAction {
                from: self.transport.local_id(),
                action,
            })
            .map_err(|_| TransportError::Closed)
    }
}
