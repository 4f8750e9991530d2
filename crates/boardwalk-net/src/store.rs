//! Canonical state container and the snapshot merge contract.
//!
//! Each participant owns exactly one `StateStore`. The host mutates its
//! state through the reducer; clients wholesale-replace theirs whenever a
//! snapshot arrives. The locally-owned identity fields are excluded from
//! replication by construction (`#[serde(skip)]` on the state) and
//! re-stamped here after every merge.

use crate::transport::SessionId;
use boardwalk_core::{GameSettings, GameState};

pub struct StateStore {
    state: GameState,
    my_id: Option<SessionId>,
    room_id: Option<String>,
}

impl StateStore {
    pub fn new(settings: GameSettings) -> Self {
        Self {
            state: GameState::new(settings),
            my_id: None,
            room_id: None,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn my_id(&self) -> Option<&str> {
        self.my_id.as_deref()
    }

    pub fn set_identity(&mut self, id: SessionId) {
        self.state.my_id = Some(id.clone());
        self.my_id = Some(id);
    }

    pub fn set_room(&mut self, room: String) {
        self.state.current_room_id = Some(room.clone());
        self.room_id = Some(room);
    }

    /// Accept a replicated snapshot: replace the game data wholesale, then
    /// re-stamp the locally-owned identity fields.
    pub fn merge_snapshot(&mut self, incoming: GameState) {
        self.state = incoming;
        self.state.my_id = self.my_id.clone();
        self.state.current_room_id = self.room_id.clone();
    }

    /// Plain-data copy for the transport/persistence boundary. Identity is
    /// per-participant and never crosses it.
    pub fn snapshot(&self) -> GameState {
        let mut snapshot = self.state.clone();
        snapshot.my_id = None;
        snapshot.current_room_id = None;
        snapshot
    }
}
