//! Player state and lobby identity handling.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Transport-session identifier. May change across reconnects; durable
/// identity travels in [`Player::uid`].
pub type PlayerId = String;

/// Palette offered to joining players; the host keeps colors unique.
pub const PLAYER_COLORS: [&str; 10] = [
    "#ef4444", "#f97316", "#f59e0b", "#84cc16", "#10b981", "#06b6d4", "#3b82f6", "#8b5cf6",
    "#d946ef", "#f43f5e",
];

const DEFAULT_AVATAR: &str = "👤";

/// A participant in the game.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Session id; rewritten in place when the player rejoins.
    pub id: PlayerId,
    /// Durable identity key surviving reconnects.
    #[serde(default)]
    pub uid: Option<String>,
    pub name: String,
    /// Signed: debt is representable.
    pub cash: i64,
    pub position: usize,
    pub color: String,
    pub in_jail: bool,
    pub jail_turns: u8,
    pub is_host: bool,
    pub avatar: String,
    #[serde(default)]
    pub bankrupt: bool,
    /// Last player paid rent to, kept for the UI only.
    #[serde(default)]
    pub last_creditor: Option<PlayerId>,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>, cash: i64) -> Self {
        Self {
            id: id.into(),
            uid: None,
            name: name.into(),
            cash,
            position: 0,
            color: String::new(),
            in_jail: false,
            jail_turns: 0,
            is_host: false,
            avatar: DEFAULT_AVATAR.to_string(),
            bankrupt: false,
            last_creditor: None,
        }
    }

    /// Re-attach a returning player to a fresh session. Only identity fields
    /// change; cash, position, jail state and ownership are untouched.
    pub fn rejoin(&mut self, session_id: &str, name: &str, avatar: Option<&str>) {
        self.id = session_id.to_string();
        self.name = name.to_string();
        if let Some(avatar) = avatar {
            self.avatar = avatar.to_string();
        }
    }
}

/// Pick a color not yet in use. A free requested color wins; otherwise a
/// random free palette entry; a full palette falls back to a random hex.
pub fn unique_color(requested: Option<&str>, used: &[String]) -> String {
    if let Some(color) = requested {
        if !used.iter().any(|u| u == color) {
            return color.to_string();
        }
    }

    let mut rng = rand::thread_rng();
    let available: Vec<&str> = PLAYER_COLORS
        .iter()
        .copied()
        .filter(|c| !used.iter().any(|u| u == c))
        .collect();

    match available.choose(&mut rng) {
        Some(color) => (*color).to_string(),
        None => format!("#{:06x}", rng.gen_range(0..0x1000000)),
    }
}
