//! Game actions, trade offers, and reducer side-effect intents.
//!
//! Actions are the closed intent vocabulary clients submit to the host. The
//! serde attributes reproduce the wire shape `{"type": "...", "payload": ...}`
//! with SCREAMING_SNAKE_CASE tags, so snapshots and intents stay readable in
//! the persisted documents.

use crate::player::PlayerId;
use serde::{Deserialize, Serialize};

/// All intents a participant can submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameAction {
    // ==================== Lobby ====================
    /// Enter the lobby, or re-attach to an existing seat (rejoin).
    Join(JoinRequest),
    /// Start the match (host player only).
    StartGame,
    /// Tear the match down (host player only).
    EndGame,

    // ==================== Turn actions ====================
    /// Roll two dice; once per turn unless doubles grant another roll.
    RollDice,
    /// Buy the unowned tile the player stands on.
    BuyProperty,
    /// Pay the jail fine, auto-roll out, and end the turn.
    PayJailFine,
    /// Pass the turn to the next non-bankrupt player.
    EndTurn,
    /// Concede: release all assets and leave the running order.
    Bankruptcy,

    // ==================== Trading ====================
    /// Put a trade on the table, replacing any pending one.
    OfferTrade(TradeOffer),
    /// Accept the pending trade (target only).
    AcceptTrade {
        #[serde(rename = "tradeId")]
        trade_id: String,
    },
    /// Decline the pending trade (target only).
    RejectTrade {
        #[serde(rename = "tradeId")]
        trade_id: String,
    },
    /// Withdraw the pending trade (initiator only).
    CancelTrade {
        #[serde(rename = "tradeId")]
        trade_id: String,
    },

    // ==================== Building ====================
    /// Add a house (hotel at five) to an owned monopoly tile.
    UpgradeProperty {
        #[serde(rename = "tileId")]
        tile_id: usize,
    },
    /// Sell a house back for half the build cost.
    DowngradeProperty {
        #[serde(rename = "tileId")]
        tile_id: usize,
    },
}

/// Payload of a `JOIN` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    /// Durable identity key; a match re-attaches the existing seat.
    #[serde(default)]
    pub uid: Option<String>,
}

/// A proposed exchange between two players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeOffer {
    pub id: String,
    pub initiator: PlayerId,
    pub target: PlayerId,
    pub offer_cash: i64,
    pub offer_properties: Vec<usize>,
    pub request_cash: i64,
    pub request_properties: Vec<usize>,
    #[serde(default)]
    pub status: TradeStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

/// Sound cue identifiers consumed by the presentation sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Sound {
    Roll,
    Buy,
    Cash,
    Fail,
    Win,
    Turn,
    Bankrupt,
    Hotel,
    Fine,
    Tax,
    Deal,
    House,
    Vacation,
    NegativeMoney,
}

/// Notification severity for the presentation sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Side-effect intents emitted by the reducer.
///
/// The reducer never talks to the sink directly; it returns these and the
/// caller dispatches them after the state mutation has committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Sound(Sound),
    Log(String),
    Notify { message: String, severity: Severity },
}
