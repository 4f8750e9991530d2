//! Wire protocol: the replication envelope and persisted document shapes.

use boardwalk_core::{GameAction, GameState};
use serde::de::Error as DeError;
use serde::ser::Error as SerError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Messages crossing the transport boundary.
///
/// `STATE_UPDATE` flows host to client only; `ACTION` flows client to host
/// only (or is short-circuited locally when the caller is the host).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Envelope {
    StateUpdate(GameState),
    Action(WireAction),
}

/// A client intent addressed to the host: `{type, payload, from}` on the
/// wire. The untyped shape is decoded into the closed [`GameAction`]
/// vocabulary right here at the boundary, before anything reaches the
/// reducer.
#[derive(Debug, Clone)]
pub struct WireAction {
    pub from: String,
    pub action: GameAction,
}

impl Serialize for WireAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut value = serde_json::to_value(&self.action).map_err(S::Error::custom)?;
        match value.as_object_mut() {
            Some(obj) => {
                obj.insert("from".to_string(), Value::String(self.from.clone()));
            }
            None => return Err(S::Error::custom("action did not serialize to an object")),
        }
        value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WireAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut value = Value::deserialize(deserializer)?;
        let from = value
            .get("from")
            .and_then(Value::as_str)
            .ok_or_else(|| D::Error::missing_field("from"))?
            .to_string();
        if let Some(obj) = value.as_object_mut() {
            obj.remove("from");
        }
        let action: GameAction = serde_json::from_value(value).map_err(D::Error::custom)?;
        Ok(Self { from, action })
    }
}

/// Snapshot document persisted by the shared-document backend, keyed by
/// room identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDoc {
    pub state: GameState,
    pub updated_at: u64,
}

/// A discrete, individually-addressed action record under a room's
/// namespace. Deleted by the host as soon as it is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub id: Uuid,
    pub action: WireAction,
}

impl ActionRecord {
    pub fn new(action: WireAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
        }
    }
}

/// Milliseconds since the epoch; clamps to zero on a pre-epoch clock.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
