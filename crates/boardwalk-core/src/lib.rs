//! Boardwalk - a host-authoritative property trading game engine.
//!
//! This crate holds the authoritative game logic: one writer (the host)
//! mutates a single [`GameState`] through typed actions; everyone else holds
//! a read-mostly replica refreshed by full snapshots. The engine does no
//! I/O and emits side-effect intents instead of touching any sink directly,
//! which keeps it portable across transports.
//!
//! # Modules
//!
//! - [`actions`]: the closed action vocabulary, trade offers, and effects
//! - [`board`]: tiles, color groups, and the built-in world map
//! - [`cards`]: treasure and surprise decks with typed card effects
//! - [`game`]: the state machine and reducer
//! - [`player`]: player state and lobby identity handling

pub mod actions;
pub mod board;
pub mod cards;
pub mod game;
pub mod player;

// Re-export commonly used types
pub use actions::{Effect, GameAction, JoinRequest, Severity, Sound, TradeOffer, TradeStatus};
pub use board::{Board, Tile, TileKind};
pub use cards::{Card, CardEffect, Deck, DeckError};
pub use game::{GameError, GameSettings, GameState, GameStatus, MAX_LOG_ENTRIES};
pub use player::{unique_color, Player, PlayerId, PLAYER_COLORS};
