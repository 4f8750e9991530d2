//! Core game state machine.
//!
//! The host owns the single mutable [`GameState`] and mutates it exclusively
//! through [`GameState::apply_action`]. The reducer validates, mutates, and
//! returns side-effect intents; it never throws across an action boundary
//! and never performs I/O.

use crate::actions::{Effect, GameAction, JoinRequest, Sound, TradeOffer, TradeStatus};
use crate::board::{Board, TileKind};
use crate::cards::{CardEffect, Deck};
use crate::player::{unique_color, Player, PlayerId};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bound on the replicated action log (newest first).
pub const MAX_LOG_ENTRIES: usize = 50;

/// Third consecutive double goes straight to prison.
const MAX_CONSECUTIVE_DOUBLES: u8 = 3;

/// Four houses plus a hotel.
const MAX_HOUSES: u8 = 5;

/// Utility rent multiplier by how many utilities the owner holds (1/2/3+).
const UTILITY_MULTIPLIERS: [i64; 3] = [4, 10, 20];

/// Game lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Lobby,
    Playing,
    GameOver,
}

/// Lobby-configurable match settings, replicated inside the state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    pub starting_cash: i64,
    pub pass_go_amount: i64,
    pub jail_fine: i64,
    pub map_selection: String,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            starting_cash: 1500,
            pass_go_amount: 200,
            jail_fine: 50,
            map_selection: "world".to_string(),
        }
    }
}

/// Errors that can occur when applying actions.
///
/// These are validation rejections: the state is untouched and the caller
/// surfaces them as a local notification at most.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("not your turn")]
    NotYourTurn,

    #[error("game has not started")]
    NotStarted,

    #[error("game is already running")]
    AlreadyStarted,

    #[error("game is over")]
    GameOver,

    #[error("unknown player: {0}")]
    UnknownPlayer(String),

    #[error("only the host may do that")]
    NotHost,

    #[error("need at least two players")]
    NotEnoughPlayers,

    #[error("dice already rolled this turn")]
    AlreadyRolled,

    #[error("player is not in prison")]
    NotInJail,

    #[error("no such tile: {0}")]
    NoSuchTile(usize),

    #[error("tile is not for sale")]
    NotForSale,

    #[error("tile is already owned")]
    AlreadyOwned,

    #[error("you do not own that tile")]
    NotOwner,

    #[error("cannot afford this")]
    CannotAfford,

    #[error("tile cannot hold houses")]
    NotBuildable,

    #[error("tile already has a hotel")]
    MaxHouses,

    #[error("you need every property in the group")]
    NotAMonopoly,

    #[error("build evenly across the group")]
    UnevenBuild,

    #[error("no houses to sell on that tile")]
    NoHouses,

    #[error("no active trade")]
    NoActiveTrade,

    #[error("trade id does not match")]
    TradeMismatch,

    #[error("not a party to this trade")]
    NotYourTrade,

    #[error("invalid trade")]
    InvalidTrade,

    #[error("settle your debt before ending the turn")]
    DebtOutstanding,
}

/// The complete replicated game state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub status: GameStatus,
    /// Index into `players` of the current actor.
    pub turn_index: usize,
    pub players: Vec<Player>,
    pub board: Board,
    /// `[0, 0]` when no roll has been taken this turn.
    pub dice: [u8; 2],
    /// Newest first, bounded to [`MAX_LOG_ENTRIES`].
    pub last_action_log: Vec<String>,
    pub settings: GameSettings,
    pub consecutive_doubles: u8,
    /// Diverted taxes and fines, paid out on the vacation tile.
    pub vacation_pot: i64,
    /// At most one in-flight trade; later offers overwrite it.
    #[serde(default)]
    pub current_trade: Option<TradeOffer>,
    /// Millis timestamp of the last processed action.
    #[serde(default)]
    pub last_activity: u64,
    #[serde(default)]
    pub winner: Option<Player>,
    /// Locally-owned identity: never replicated, re-stamped after merges.
    #[serde(skip)]
    pub my_id: Option<PlayerId>,
    #[serde(skip)]
    pub current_room_id: Option<String>,
    /// Card decks are static configuration, not replicated state.
    #[serde(skip, default = "Deck::treasure")]
    pub treasure_deck: Deck,
    #[serde(skip, default = "Deck::surprise")]
    pub surprise_deck: Deck,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(GameSettings::default())
    }
}

impl GameState {
    /// A fresh lobby with the settings' map loaded and no players.
    pub fn new(settings: GameSettings) -> Self {
        let board = Board::by_key(&settings.map_selection);
        Self {
            status: GameStatus::Lobby,
            turn_index: 0,
            players: Vec::new(),
            board,
            dice: [0, 0],
            last_action_log: Vec::new(),
            settings,
            consecutive_doubles: 0,
            vacation_pot: 0,
            current_trade: None,
            last_activity: 0,
            winner: None,
            my_id: None,
            current_room_id: None,
            treasure_deck: Deck::treasure(),
            surprise_deck: Deck::surprise(),
        }
    }

    /// Tear down to lobby defaults, keeping the settings.
    pub fn reset(&mut self) {
        *self = GameState::new(self.settings.clone());
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    fn player_index(&self, id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.turn_index)
    }

    /// Refresh the activity timestamp; called on every processed action.
    pub fn touch(&mut self, now_ms: u64) {
        self.last_activity = now_ms;
    }

    /// Whether the game has sat idle past the given threshold.
    pub fn is_inactive(&self, now_ms: u64, threshold_ms: u64) -> bool {
        self.last_activity > 0 && now_ms.saturating_sub(self.last_activity) > threshold_ms
    }

    /// Apply an action from a participant. This is the single write path:
    /// validate, mutate, and report side-effect intents for the sink.
    pub fn apply_action(&mut self, from: &str, action: GameAction) -> Result<Vec<Effect>, GameError> {
        if self.status == GameStatus::GameOver && !matches!(action, GameAction::Join(_)) {
            return Err(GameError::GameOver);
        }

        match action {
            // Lobby operations and host-validated actions: not turn-gated.
            GameAction::Join(req) => self.join(from, req),
            GameAction::StartGame => self.start_game(from),
            GameAction::EndGame => self.end_game(from),
            GameAction::OfferTrade(offer) => self.offer_trade(from, offer),
            GameAction::AcceptTrade { trade_id } => self.accept_trade(from, &trade_id),
            GameAction::RejectTrade { trade_id } => self.reject_trade(from, &trade_id),
            GameAction::CancelTrade { trade_id } => self.cancel_trade(from, &trade_id),
            GameAction::UpgradeProperty { tile_id } => self.upgrade_property(from, tile_id),
            GameAction::DowngradeProperty { tile_id } => self.downgrade_property(from, tile_id),

            // Everything below requires it to be the sender's turn.
            GameAction::RollDice => {
                self.require_current(from)?;
                let mut rng = rand::thread_rng();
                let d1 = rng.gen_range(1..=6);
                let d2 = rng.gen_range(1..=6);
                self.resolve_roll(d1, d2)
            }
            GameAction::BuyProperty => {
                let idx = self.require_current(from)?;
                self.buy_property(idx)
            }
            GameAction::PayJailFine => {
                let idx = self.require_current(from)?;
                self.pay_jail_fine(idx)
            }
            GameAction::EndTurn => {
                let idx = self.require_current(from)?;
                self.end_turn(idx)
            }
            GameAction::Bankruptcy => {
                let idx = self.require_current(from)?;
                self.declare_bankruptcy(idx)
            }
        }
    }

    fn require_current(&self, from: &str) -> Result<usize, GameError> {
        if self.status != GameStatus::Playing {
            return Err(GameError::NotStarted);
        }
        let current = self.players.get(self.turn_index).ok_or(GameError::NotStarted)?;
        if current.id != from {
            return Err(GameError::NotYourTurn);
        }
        Ok(self.turn_index)
    }

    // ==================== Lobby ====================

    fn join(&mut self, from: &str, req: JoinRequest) -> Result<Vec<Effect>, GameError> {
        let mut effects = Vec::new();

        // Durable identity wins: re-attach the existing seat to this session.
        if let Some(uid) = req.uid.as_deref() {
            if let Some(idx) = self
                .players
                .iter()
                .position(|p| p.uid.as_deref() == Some(uid))
            {
                self.players[idx].rejoin(from, &req.name, req.avatar.as_deref());
                let name = self.players[idx].name.clone();
                self.log(&mut effects, format!("{name} reconnected"));
                return Ok(effects);
            }
        }

        // Same session id: refresh display fields only.
        if let Some(idx) = self.player_index(from) {
            self.players[idx].rejoin(from, &req.name, req.avatar.as_deref());
            let name = self.players[idx].name.clone();
            self.log(&mut effects, format!("{name} rejoined"));
            return Ok(effects);
        }

        // A genuinely new player can only enter the lobby.
        if self.status != GameStatus::Lobby {
            return Err(GameError::AlreadyStarted);
        }

        let used: Vec<String> = self.players.iter().map(|p| p.color.clone()).collect();
        let mut player = Player::new(from, req.name, self.settings.starting_cash);
        player.uid = req.uid;
        player.color = unique_color(req.color.as_deref(), &used);
        if let Some(avatar) = req.avatar.filter(|a| !a.is_empty()) {
            player.avatar = avatar;
        }
        player.is_host = self.players.is_empty();

        let name = player.name.clone();
        self.players.push(player);
        self.log(&mut effects, format!("Player {name} joined"));
        Ok(effects)
    }

    fn start_game(&mut self, from: &str) -> Result<Vec<Effect>, GameError> {
        let host = self
            .player(from)
            .ok_or_else(|| GameError::UnknownPlayer(from.to_string()))?;
        if !host.is_host {
            return Err(GameError::NotHost);
        }
        if self.status != GameStatus::Lobby {
            return Err(GameError::AlreadyStarted);
        }
        if self.players.len() < 2 {
            return Err(GameError::NotEnoughPlayers);
        }

        self.board = Board::by_key(&self.settings.map_selection);
        self.status = GameStatus::Playing;
        self.turn_index = 0;
        self.dice = [0, 0];
        self.consecutive_doubles = 0;
        self.vacation_pot = 0;

        let map = self.settings.map_selection.clone();
        let mut effects = Vec::new();
        self.log(&mut effects, format!("Game started on the {map} map"));
        effects.push(Effect::Sound(Sound::Turn));
        Ok(effects)
    }

    fn end_game(&mut self, from: &str) -> Result<Vec<Effect>, GameError> {
        let host = self
            .player(from)
            .ok_or_else(|| GameError::UnknownPlayer(from.to_string()))?;
        if !host.is_host {
            return Err(GameError::NotHost);
        }

        self.status = GameStatus::GameOver;
        let mut effects = Vec::new();
        self.log(&mut effects, "Host ended the game".to_string());
        Ok(effects)
    }

    // ==================== Dice and movement ====================

    /// Resolve a specific dice pair for the current player. `ROLL_DICE`
    /// draws random dice and delegates here; tests drive fixed rolls.
    pub fn resolve_roll(&mut self, d1: u8, d2: u8) -> Result<Vec<Effect>, GameError> {
        if self.status != GameStatus::Playing {
            return Err(GameError::NotStarted);
        }
        let idx = self.turn_index;
        if idx >= self.players.len() {
            return Err(GameError::NotStarted);
        }

        let mut effects = Vec::new();

        // Rolling is not an escape route from prison; the turn just passes.
        if self.players[idx].in_jail {
            self.next_turn(&mut effects);
            return Ok(effects);
        }

        if self.dice != [0, 0] {
            return Err(GameError::AlreadyRolled);
        }

        self.dice = [d1, d2];
        effects.push(Effect::Sound(Sound::Roll));
        let name = self.players[idx].name.clone();

        if d1 == d2 {
            self.consecutive_doubles += 1;
            if self.consecutive_doubles >= MAX_CONSECUTIVE_DOUBLES {
                self.log(
                    &mut effects,
                    format!("{name} rolled three doubles in a row! Straight to prison"),
                );
                self.send_to_jail(idx, &mut effects);
                effects.push(Effect::Sound(Sound::Fail));
                self.next_turn(&mut effects);
                return Ok(effects);
            }
            self.log(&mut effects, format!("{name} rolled doubles ({d1}-{d2})"));
        } else {
            self.consecutive_doubles = 0;
        }

        let total = d1 + d2;
        self.log(&mut effects, format!("{name} rolled {total} ({d1}+{d2})"));
        let jailed = self.move_player(idx, total as usize, &mut effects);

        if jailed {
            self.next_turn(&mut effects);
        } else if d1 == d2 {
            // Doubles grant another roll.
            self.dice = [0, 0];
        }

        Ok(effects)
    }

    /// Advance a player and resolve the landing. Returns true when the
    /// landing jailed the player and the turn must end now.
    fn move_player(&mut self, idx: usize, steps: usize, effects: &mut Vec<Effect>) -> bool {
        let len = self.board.len();
        if len == 0 {
            return false;
        }

        let raw = self.players[idx].position + steps;
        if raw >= len {
            let bonus = self.settings.pass_go_amount;
            self.players[idx].cash += bonus;
            let name = self.players[idx].name.clone();
            self.log(effects, format!("{name} passed GO and collected ${bonus}"));
            effects.push(Effect::Sound(Sound::Cash));
        }
        self.players[idx].position = raw % len;

        self.handle_landing(idx, effects)
    }

    fn handle_landing(&mut self, idx: usize, effects: &mut Vec<Effect>) -> bool {
        let pos = self.players[idx].position;
        let tile = match self.board.tile(pos) {
            Some(tile) => tile.clone(),
            None => return false,
        };
        let name = self.players[idx].name.clone();

        match tile.kind {
            TileKind::Property | TileKind::Airport | TileKind::Utility => {
                self.log(effects, format!("{name} landed on {}", tile.name));
                if let Some(owner_id) = tile.owner.clone() {
                    if owner_id != self.players[idx].id {
                        self.pay_rent(idx, &tile, &owner_id, effects);
                    }
                }
                false
            }
            TileKind::Tax => {
                let due = match tile.amount {
                    Some(amount) => amount,
                    // Income-tax style: a tenth of total worth.
                    None => self.net_worth(idx) / 10,
                };
                if due > 0 {
                    self.players[idx].cash -= due;
                    self.vacation_pot += due;
                    let pot = self.vacation_pot;
                    self.log(
                        effects,
                        format!("{name} paid {}: ${due} (pot: ${pot})", tile.name),
                    );
                    effects.push(Effect::Sound(Sound::Tax));
                }
                false
            }
            TileKind::JailVisit if tile.sends_to_prison() => {
                self.send_to_jail(idx, effects);
                effects.push(Effect::Sound(Sound::Fail));
                true
            }
            TileKind::Prison | TileKind::JailVisit => {
                self.log(effects, format!("{name} is just visiting prison"));
                false
            }
            TileKind::Vacation => {
                if self.vacation_pot > 0 {
                    let amount = self.vacation_pot;
                    self.vacation_pot = 0;
                    self.players[idx].cash += amount;
                    self.log(
                        effects,
                        format!("{name} collected the vacation pot: ${amount}"),
                    );
                    effects.push(Effect::Sound(Sound::Vacation));
                } else {
                    self.log(effects, format!("{name} is on vacation"));
                }
                false
            }
            TileKind::Treasure | TileKind::Surprise => self.draw_card(idx, tile.kind, effects),
            TileKind::Start => {
                self.log(effects, format!("{name} landed on Start"));
                false
            }
        }
    }

    fn pay_rent(&mut self, idx: usize, tile: &crate::board::Tile, owner_id: &str, effects: &mut Vec<Effect>) {
        let owner_idx = match self.player_index(owner_id) {
            Some(i) => i,
            None => return,
        };
        if self.players[owner_idx].bankrupt {
            return;
        }

        let rent = match tile.kind {
            TileKind::Property => tile.rent_at(tile.house_count),
            TileKind::Airport => {
                let owned = self.board.owned_count(owner_id, TileKind::Airport) as u32;
                tile.rent.first().copied().unwrap_or(25) << owned.saturating_sub(1)
            }
            TileKind::Utility => {
                let owned = self.board.owned_count(owner_id, TileKind::Utility);
                let multiplier = UTILITY_MULTIPLIERS[owned.clamp(1, 3) - 1];
                (self.dice[0] as i64 + self.dice[1] as i64) * multiplier
            }
            _ => return,
        };

        self.players[idx].cash -= rent;
        self.players[idx].last_creditor = Some(owner_id.to_string());
        self.players[owner_idx].cash += rent;

        let payer = self.players[idx].name.clone();
        let owner_name = self.players[owner_idx].name.clone();
        self.log(effects, format!("{payer} paid ${rent} rent to {owner_name}"));
        effects.push(Effect::Sound(Sound::Cash));
        if self.players[idx].cash < 0 {
            effects.push(Effect::Sound(Sound::NegativeMoney));
        }
    }

    fn draw_card(&mut self, idx: usize, kind: TileKind, effects: &mut Vec<Effect>) -> bool {
        let mut rng = rand::thread_rng();
        let card = match kind {
            TileKind::Treasure => self.treasure_deck.draw(&mut rng),
            TileKind::Surprise => self.surprise_deck.draw(&mut rng),
            _ => None,
        };
        let card = match card {
            Some(card) => card.clone(),
            None => return false,
        };

        let name = self.players[idx].name.clone();
        let label = if kind == TileKind::Treasure {
            "treasure"
        } else {
            "surprise"
        };
        self.log(effects, format!("{name} drew {label}: {}", card.text));

        match card.effect {
            CardEffect::AddCash(amount) => {
                self.players[idx].cash += amount;
                effects.push(Effect::Sound(Sound::Cash));
                false
            }
            CardEffect::SubCash(amount) => {
                self.players[idx].cash -= amount;
                effects.push(Effect::Sound(Sound::Fail));
                false
            }
            CardEffect::GoToJail => {
                self.send_to_jail(idx, effects);
                effects.push(Effect::Sound(Sound::Fail));
                true
            }
            CardEffect::MoveTo(target) => {
                if self.board.tile(target).is_none() {
                    return false;
                }
                self.players[idx].position = target;
                self.handle_landing(idx, effects)
            }
        }
    }

    fn send_to_jail(&mut self, idx: usize, effects: &mut Vec<Effect>) {
        if let Some(prison) = self.board.prison_index() {
            self.players[idx].position = prison;
        }
        self.players[idx].in_jail = true;
        self.players[idx].jail_turns = 0;
        let name = self.players[idx].name.clone();
        self.log(effects, format!("{name} was sent to prison"));
    }

    // ==================== Turn management ====================

    fn end_turn(&mut self, idx: usize) -> Result<Vec<Effect>, GameError> {
        if self.players[idx].cash < 0 {
            return Err(GameError::DebtOutstanding);
        }
        let mut effects = Vec::new();
        self.next_turn(&mut effects);
        Ok(effects)
    }

    fn next_turn(&mut self, effects: &mut Vec<Effect>) {
        self.dice = [0, 0];
        self.consecutive_doubles = 0;

        let total = self.players.len();
        if total == 0 {
            return;
        }
        let mut next = self.turn_index;
        // One lap at most, in case everyone left is bankrupt.
        for _ in 0..total {
            next = (next + 1) % total;
            if !self.players[next].bankrupt {
                break;
            }
        }
        self.turn_index = next;

        let name = self.players[next].name.clone();
        self.log(effects, format!("Now it's {name}'s turn"));
        effects.push(Effect::Sound(Sound::Turn));
    }

    fn pay_jail_fine(&mut self, idx: usize) -> Result<Vec<Effect>, GameError> {
        if !self.players[idx].in_jail {
            return Err(GameError::NotInJail);
        }

        let mut effects = Vec::new();
        let fine = self.settings.jail_fine;

        // The fine is owed even into debt.
        self.players[idx].cash -= fine;
        self.vacation_pot += fine;
        self.players[idx].in_jail = false;
        self.players[idx].jail_turns = 0;

        let name = self.players[idx].name.clone();
        self.log(&mut effects, format!("{name} paid the ${fine} prison fine"));
        effects.push(Effect::Sound(Sound::Fine));
        if self.players[idx].cash < 0 {
            self.log(&mut effects, format!("{name} went into debt to leave prison"));
            effects.push(Effect::Sound(Sound::NegativeMoney));
        }

        // Roll out on the player's behalf; the turn always ends afterwards.
        let mut rng = rand::thread_rng();
        let d1: u8 = rng.gen_range(1..=6);
        let d2: u8 = rng.gen_range(1..=6);
        self.dice = [d1, d2];
        let total = d1 + d2;
        self.log(&mut effects, format!("{name} rolled {total} ({d1}+{d2})"));
        self.move_player(idx, total as usize, &mut effects);
        self.next_turn(&mut effects);
        Ok(effects)
    }

    // ==================== Property transactions ====================

    fn buy_property(&mut self, idx: usize) -> Result<Vec<Effect>, GameError> {
        let pos = self.players[idx].position;
        let (price, tile_name) = {
            let tile = self.board.tile(pos).ok_or(GameError::NoSuchTile(pos))?;
            if !tile.is_rentable() || tile.price <= 0 {
                return Err(GameError::NotForSale);
            }
            if tile.owner.is_some() {
                return Err(GameError::AlreadyOwned);
            }
            (tile.price, tile.name.clone())
        };
        if self.players[idx].cash < price {
            return Err(GameError::CannotAfford);
        }

        let buyer_id = self.players[idx].id.clone();
        let name = self.players[idx].name.clone();
        self.players[idx].cash -= price;
        if let Some(tile) = self.board.tile_mut(pos) {
            tile.owner = Some(buyer_id);
        }

        let mut effects = Vec::new();
        self.log(&mut effects, format!("{name} bought {tile_name} for ${price}"));
        effects.push(Effect::Sound(Sound::Buy));
        Ok(effects)
    }

    fn upgrade_property(&mut self, from: &str, tile_id: usize) -> Result<Vec<Effect>, GameError> {
        if self.status != GameStatus::Playing {
            return Err(GameError::NotStarted);
        }
        let idx = self
            .player_index(from)
            .ok_or_else(|| GameError::UnknownPlayer(from.to_string()))?;

        let (group, cost, tile_name, houses) = {
            let tile = self.board.tile(tile_id).ok_or(GameError::NoSuchTile(tile_id))?;
            if tile.kind != TileKind::Property {
                return Err(GameError::NotBuildable);
            }
            if tile.owner.as_deref() != Some(from) {
                return Err(GameError::NotOwner);
            }
            let group = tile.group.clone().ok_or(GameError::NotBuildable)?;
            let cost = tile.build_cost.ok_or(GameError::NotBuildable)?;
            (group, cost, tile.name.clone(), tile.house_count)
        };

        if houses >= MAX_HOUSES {
            return Err(GameError::MaxHouses);
        }
        if !self.board.owns_full_group(from, &group) {
            return Err(GameError::NotAMonopoly);
        }
        // Even build: only the group's least-developed tiles may grow.
        let group_min = self
            .board
            .group_tiles(&group)
            .iter()
            .map(|t| t.house_count)
            .min()
            .unwrap_or(0);
        if houses > group_min {
            return Err(GameError::UnevenBuild);
        }
        if self.players[idx].cash < cost {
            return Err(GameError::CannotAfford);
        }

        self.players[idx].cash -= cost;
        let new_count = houses + 1;
        if let Some(tile) = self.board.tile_mut(tile_id) {
            tile.house_count = new_count;
        }

        let name = self.players[idx].name.clone();
        let mut effects = Vec::new();
        if new_count == MAX_HOUSES {
            self.log(&mut effects, format!("{name} built a hotel on {tile_name}"));
            effects.push(Effect::Sound(Sound::Hotel));
        } else {
            self.log(
                &mut effects,
                format!("{name} built a house on {tile_name} ({new_count})"),
            );
            effects.push(Effect::Sound(Sound::House));
        }
        Ok(effects)
    }

    fn downgrade_property(&mut self, from: &str, tile_id: usize) -> Result<Vec<Effect>, GameError> {
        if self.status != GameStatus::Playing {
            return Err(GameError::NotStarted);
        }
        let idx = self
            .player_index(from)
            .ok_or_else(|| GameError::UnknownPlayer(from.to_string()))?;

        let (group, cost, tile_name, houses) = {
            let tile = self.board.tile(tile_id).ok_or(GameError::NoSuchTile(tile_id))?;
            if tile.kind != TileKind::Property {
                return Err(GameError::NotBuildable);
            }
            if tile.owner.as_deref() != Some(from) {
                return Err(GameError::NotOwner);
            }
            let group = tile.group.clone().ok_or(GameError::NotBuildable)?;
            let cost = tile.build_cost.ok_or(GameError::NotBuildable)?;
            (group, cost, tile.name.clone(), tile.house_count)
        };

        if houses == 0 {
            return Err(GameError::NoHouses);
        }
        // Mirror of even build: only the most-developed tile sells.
        let group_max = self
            .board
            .group_tiles(&group)
            .iter()
            .map(|t| t.house_count)
            .max()
            .unwrap_or(0);
        if houses < group_max {
            return Err(GameError::UnevenBuild);
        }

        let refund = cost / 2;
        self.players[idx].cash += refund;
        if let Some(tile) = self.board.tile_mut(tile_id) {
            tile.house_count = houses - 1;
        }

        let name = self.players[idx].name.clone();
        let mut effects = Vec::new();
        self.log(
            &mut effects,
            format!("{name} sold a house on {tile_name} for ${refund}"),
        );
        effects.push(Effect::Sound(Sound::Cash));
        Ok(effects)
    }

    // ==================== Trading ====================

    fn offer_trade(&mut self, from: &str, mut offer: TradeOffer) -> Result<Vec<Effect>, GameError> {
        if self.status != GameStatus::Playing {
            return Err(GameError::NotStarted);
        }
        if offer.initiator != from || offer.initiator == offer.target {
            return Err(GameError::InvalidTrade);
        }
        if self.player(&offer.target).is_none() {
            return Err(GameError::InvalidTrade);
        }
        let initiator_name = self
            .player(from)
            .map(|p| p.name.clone())
            .ok_or_else(|| GameError::UnknownPlayer(from.to_string()))?;

        offer.status = TradeStatus::Pending;
        // A later offer replaces any pending one; there is no queue.
        self.current_trade = Some(offer);

        let mut effects = Vec::new();
        self.log(&mut effects, format!("{initiator_name} offered a trade"));
        Ok(effects)
    }

    fn accept_trade(&mut self, from: &str, trade_id: &str) -> Result<Vec<Effect>, GameError> {
        let trade = match self.current_trade.take() {
            Some(trade) => trade,
            None => return Err(GameError::NoActiveTrade),
        };
        if trade.id != trade_id {
            // Stale accept for a superseded offer; the pending one stays.
            self.current_trade = Some(trade);
            return Err(GameError::TradeMismatch);
        }
        if trade.target != from {
            self.current_trade = Some(trade);
            return Err(GameError::NotYourTrade);
        }

        let mut effects = Vec::new();
        let initiator = self.player_index(&trade.initiator);
        let target = self.player_index(&trade.target);

        if let (Some(p1), Some(p2)) = (initiator, target) {
            self.players[p1].cash += trade.request_cash - trade.offer_cash;
            self.players[p2].cash += trade.offer_cash - trade.request_cash;

            for &tid in &trade.offer_properties {
                if let Some(tile) = self.board.tile_mut(tid) {
                    // Transfer only what the initiator still owns.
                    if tile.owner.as_deref() == Some(trade.initiator.as_str()) {
                        tile.owner = Some(trade.target.clone());
                    }
                }
            }
            for &tid in &trade.request_properties {
                if let Some(tile) = self.board.tile_mut(tid) {
                    if tile.owner.as_deref() == Some(trade.target.as_str()) {
                        tile.owner = Some(trade.initiator.clone());
                    }
                }
            }

            self.log(&mut effects, "Trade completed".to_string());
            effects.push(Effect::Sound(Sound::Deal));
        } else {
            self.log(&mut effects, "Trade is void: a party left the game".to_string());
        }
        Ok(effects)
    }

    fn reject_trade(&mut self, from: &str, trade_id: &str) -> Result<Vec<Effect>, GameError> {
        let trade = match self.current_trade.take() {
            Some(trade) => trade,
            None => return Err(GameError::NoActiveTrade),
        };
        if trade.id != trade_id {
            self.current_trade = Some(trade);
            return Err(GameError::TradeMismatch);
        }
        if trade.target != from {
            self.current_trade = Some(trade);
            return Err(GameError::NotYourTrade);
        }

        let mut effects = Vec::new();
        self.log(&mut effects, "Trade rejected".to_string());
        Ok(effects)
    }

    fn cancel_trade(&mut self, from: &str, trade_id: &str) -> Result<Vec<Effect>, GameError> {
        let trade = match self.current_trade.take() {
            Some(trade) => trade,
            None => return Err(GameError::NoActiveTrade),
        };
        if trade.id != trade_id {
            self.current_trade = Some(trade);
            return Err(GameError::TradeMismatch);
        }
        if trade.initiator != from {
            self.current_trade = Some(trade);
            return Err(GameError::NotYourTrade);
        }

        let mut effects = Vec::new();
        self.log(&mut effects, "Trade cancelled by the initiator".to_string());
        Ok(effects)
    }

    // ==================== Bankruptcy and win detection ====================

    fn declare_bankruptcy(&mut self, idx: usize) -> Result<Vec<Effect>, GameError> {
        let mut effects = Vec::new();
        let id = self.players[idx].id.clone();
        let name = self.players[idx].name.clone();

        self.players[idx].bankrupt = true;
        self.players[idx].cash = 0;
        self.board.release_all(&id);

        self.log(&mut effects, format!("{name} is bankrupt"));
        effects.push(Effect::Sound(Sound::Bankrupt));

        self.check_winner(&mut effects);
        if self.status == GameStatus::Playing {
            self.next_turn(&mut effects);
        }
        Ok(effects)
    }

    fn check_winner(&mut self, effects: &mut Vec<Effect>) {
        if self.players.len() < 2 {
            return;
        }
        let active: Vec<usize> = self
            .players
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.bankrupt)
            .map(|(i, _)| i)
            .collect();
        if active.len() != 1 {
            return;
        }

        let winner = self.players[active[0]].clone();
        let name = winner.name.clone();
        self.winner = Some(winner);
        self.status = GameStatus::GameOver;
        self.log(effects, format!("{name} wins the game!"));
        effects.push(Effect::Sound(Sound::Win));
    }

    // ==================== Helpers ====================

    /// Cash plus owned tile prices and house investments.
    fn net_worth(&self, idx: usize) -> i64 {
        let id = self.players[idx].id.as_str();
        let assets: i64 = self
            .board
            .iter()
            .filter(|t| t.owner.as_deref() == Some(id))
            .map(|t| t.price + t.house_count as i64 * t.build_cost.unwrap_or(0))
            .sum();
        self.players[idx].cash + assets
    }

    fn log(&mut self, effects: &mut Vec<Effect>, message: String) {
        self.last_action_log.insert(0, message.clone());
        self.last_action_log.truncate(MAX_LOG_ENTRIES);
        effects.push(Effect::Log(message));
    }
}
