//! Board representation: tiles, color groups, and the built-in world map.
//!
//! The board is an ordered tile list; a tile's `id` equals its board index.
//! External maps deserialize from the same JSON shape the built-in map uses.

use crate::player::PlayerId;
use serde::{Deserialize, Serialize};

/// Rent floor when a tile carries an empty rent table.
const RENT_FLOOR: i64 = 10;

/// Tile categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TileKind {
    Start,
    Property,
    Airport,
    Utility,
    Tax,
    Treasure,
    Surprise,
    Prison,
    Vacation,
    JailVisit,
}

/// A single board tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    pub id: usize,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TileKind,
    /// Purchase price; 0 for tiles that cannot be bought.
    #[serde(default)]
    pub price: i64,
    /// Rent by house count (0..4 houses, index 5 = hotel).
    #[serde(default)]
    pub rent: Vec<i64>,
    /// Color-set key for monopoly checks.
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub build_cost: Option<i64>,
    #[serde(default)]
    pub owner: Option<PlayerId>,
    /// 0-4 houses, 5 = hotel.
    #[serde(default)]
    pub house_count: u8,
    /// Flat charge for TAX tiles; absent means "percentage of net worth".
    #[serde(default)]
    pub amount: Option<i64>,
}

impl Tile {
    /// Whether this tile collects rent when owned.
    pub fn is_rentable(&self) -> bool {
        matches!(
            self.kind,
            TileKind::Property | TileKind::Airport | TileKind::Utility
        )
    }

    /// Whether this tile can currently be purchased.
    pub fn is_for_sale(&self) -> bool {
        self.is_rentable() && self.price > 0 && self.owner.is_none()
    }

    /// Rent for a given house count. Tables shorter than six entries clamp
    /// to their last entry; an empty table floors at a small base rent.
    pub fn rent_at(&self, houses: u8) -> i64 {
        self.rent
            .get(houses as usize)
            .or_else(|| self.rent.last())
            .copied()
            .unwrap_or(RENT_FLOOR)
    }

    /// Whether landing here sends the player to prison. The visiting corner
    /// uses `PRISON`; a `JAIL_VISIT` tile jails only when its name says so.
    pub fn sends_to_prison(&self) -> bool {
        self.kind == TileKind::JailVisit && self.name.to_lowercase().contains("go to")
    }
}

/// The game board: a fixed-length ordered tile list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    tiles: Vec<Tile>,
}

impl Board {
    /// Build a board from an explicit tile list (external map data).
    pub fn from_tiles(tiles: Vec<Tile>) -> Self {
        Self { tiles }
    }

    /// Look up a built-in board by map key. Only the world map ships with
    /// the engine; unknown keys fall back to it, and external maps load
    /// through [`Board::from_tiles`].
    pub fn by_key(_key: &str) -> Self {
        Self::world()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tile(&self, id: usize) -> Option<&Tile> {
        self.tiles.get(id)
    }

    pub fn tile_mut(&mut self, id: usize) -> Option<&mut Tile> {
        self.tiles.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Board index of the prison tile, if the map has one.
    pub fn prison_index(&self) -> Option<usize> {
        self.tiles.iter().position(|t| t.kind == TileKind::Prison)
    }

    /// All tiles in a color group.
    pub fn group_tiles(&self, group: &str) -> Vec<&Tile> {
        self.tiles
            .iter()
            .filter(|t| t.group.as_deref() == Some(group))
            .collect()
    }

    /// Whether `owner` holds every tile in `group`.
    pub fn owns_full_group(&self, owner: &str, group: &str) -> bool {
        let tiles = self.group_tiles(group);
        !tiles.is_empty() && tiles.iter().all(|t| t.owner.as_deref() == Some(owner))
    }

    /// How many tiles of `kind` the owner holds.
    pub fn owned_count(&self, owner: &str, kind: TileKind) -> usize {
        self.tiles
            .iter()
            .filter(|t| t.kind == kind && t.owner.as_deref() == Some(owner))
            .count()
    }

    /// Return all of an owner's tiles to the bank, houses included.
    pub fn release_all(&mut self, owner: &str) {
        for tile in &mut self.tiles {
            if tile.owner.as_deref() == Some(owner) {
                tile.owner = None;
                tile.house_count = 0;
            }
        }
    }

    /// The built-in 40-tile world map.
    pub fn world() -> Self {
        let tiles = vec![
            corner(0, "Start", TileKind::Start),
            prop(1, "Salvador", "brown", 60, 50, [2, 10, 30, 90, 160, 250]),
            draw(2, "Treasure", TileKind::Treasure),
            prop(3, "Rio", "brown", 60, 50, [4, 20, 60, 180, 320, 450]),
            tax(4, "Income Tax", None),
            airport(5, "TLV Airport", 200, 25),
            prop(6, "Tel Aviv", "lightblue", 100, 50, [6, 30, 90, 270, 400, 550]),
            draw(7, "Surprise", TileKind::Surprise),
            prop(8, "Haifa", "lightblue", 100, 50, [6, 30, 90, 270, 400, 550]),
            prop(9, "Jerusalem", "lightblue", 120, 50, [8, 40, 100, 300, 450, 600]),
            corner(10, "Prison", TileKind::Prison),
            prop(11, "Venice", "pink", 140, 100, [10, 50, 150, 450, 625, 750]),
            utility(12, "Electric Company", 150),
            prop(13, "Milan", "pink", 140, 100, [10, 50, 150, 450, 625, 750]),
            prop(14, "Rome", "pink", 160, 100, [12, 60, 180, 500, 700, 900]),
            airport(15, "MUC Airport", 200, 25),
            prop(16, "Frankfurt", "orange", 180, 100, [14, 70, 200, 550, 750, 950]),
            draw(17, "Treasure", TileKind::Treasure),
            prop(18, "Munich", "orange", 180, 100, [14, 70, 200, 550, 750, 950]),
            prop(19, "Berlin", "orange", 200, 100, [16, 80, 220, 600, 800, 1000]),
            corner(20, "Vacation", TileKind::Vacation),
            prop(21, "Shenzhen", "red", 220, 150, [18, 90, 250, 700, 875, 1050]),
            draw(22, "Surprise", TileKind::Surprise),
            prop(23, "Beijing", "red", 220, 150, [18, 90, 250, 700, 875, 1050]),
            prop(24, "Shanghai", "red", 240, 150, [20, 100, 300, 750, 925, 1100]),
            airport(25, "CDG Airport", 200, 25),
            prop(26, "Lyon", "yellow", 260, 150, [22, 110, 330, 800, 975, 1150]),
            prop(27, "Toulouse", "yellow", 260, 150, [22, 110, 330, 800, 975, 1150]),
            utility(28, "Water Works", 150),
            prop(29, "Paris", "yellow", 280, 150, [24, 120, 360, 850, 1025, 1200]),
            corner(30, "Go To Prison", TileKind::JailVisit),
            prop(31, "Liverpool", "green", 300, 200, [26, 130, 390, 900, 1100, 1275]),
            prop(32, "Manchester", "green", 300, 200, [26, 130, 390, 900, 1100, 1275]),
            draw(33, "Treasure", TileKind::Treasure),
            prop(34, "London", "green", 320, 200, [28, 150, 450, 1000, 1200, 1400]),
            airport(35, "JFK Airport", 200, 25),
            draw(36, "Surprise", TileKind::Surprise),
            prop(37, "California", "darkblue", 350, 200, [35, 175, 500, 1100, 1300, 1500]),
            tax(38, "Luxury Tax", Some(100)),
            prop(39, "New York", "darkblue", 400, 200, [50, 200, 600, 1400, 1700, 2000]),
        ];
        Self { tiles }
    }
}

fn prop(id: usize, name: &str, group: &str, price: i64, build_cost: i64, rent: [i64; 6]) -> Tile {
    Tile {
        id,
        name: name.to_string(),
        kind: TileKind::Property,
        price,
        rent: rent.to_vec(),
        group: Some(group.to_string()),
        build_cost: Some(build_cost),
        owner: None,
        house_count: 0,
        amount: None,
    }
}

fn airport(id: usize, name: &str, price: i64, base_rent: i64) -> Tile {
    Tile {
        id,
        name: name.to_string(),
        kind: TileKind::Airport,
        price,
        rent: vec![base_rent],
        group: Some("airport".to_string()),
        build_cost: None,
        owner: None,
        house_count: 0,
        amount: None,
    }
}

fn utility(id: usize, name: &str, price: i64) -> Tile {
    Tile {
        id,
        name: name.to_string(),
        kind: TileKind::Utility,
        price,
        rent: Vec::new(),
        group: Some("utility".to_string()),
        build_cost: None,
        owner: None,
        house_count: 0,
        amount: None,
    }
}

fn tax(id: usize, name: &str, amount: Option<i64>) -> Tile {
    Tile {
        id,
        name: name.to_string(),
        kind: TileKind::Tax,
        price: 0,
        rent: Vec::new(),
        group: None,
        build_cost: None,
        owner: None,
        house_count: 0,
        amount,
    }
}

fn corner(id: usize, name: &str, kind: TileKind) -> Tile {
    Tile {
        id,
        name: name.to_string(),
        kind,
        price: 0,
        rent: Vec::new(),
        group: None,
        build_cost: None,
        owner: None,
        house_count: 0,
        amount: None,
    }
}

fn draw(id: usize, name: &str, kind: TileKind) -> Tile {
    Tile {
        id,
        name: name.to_string(),
        kind,
        price: 0,
        rent: Vec::new(),
        group: None,
        build_cost: None,
        owner: None,
        house_count: 0,
        amount: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_map_layout() {
        let board = Board::world();
        assert_eq!(board.len(), 40);
        assert_eq!(board.tile(0).unwrap().kind, TileKind::Start);
        assert_eq!(board.prison_index(), Some(10));
        assert_eq!(board.tile(20).unwrap().kind, TileKind::Vacation);
        assert!(board.tile(30).unwrap().sends_to_prison());
        assert!(!board.tile(10).unwrap().sends_to_prison());

        // Every tile's id matches its index.
        for (idx, tile) in board.iter().enumerate() {
            assert_eq!(tile.id, idx);
        }
    }

    #[test]
    fn test_rent_lookup_clamps_to_last_entry() {
        let mut tile = prop(1, "Salvador", "brown", 60, 50, [2, 10, 30, 90, 160, 250]);
        assert_eq!(tile.rent_at(0), 2);
        assert_eq!(tile.rent_at(5), 250);

        // Short table: hotel rent clamps to the last entry.
        tile.rent = vec![2, 10, 30];
        assert_eq!(tile.rent_at(5), 30);

        // Empty table floors.
        tile.rent = Vec::new();
        assert_eq!(tile.rent_at(3), 10);
    }

    #[test]
    fn test_group_queries() {
        let mut board = Board::world();
        assert_eq!(board.group_tiles("brown").len(), 2);
        assert!(!board.owns_full_group("p1", "brown"));

        board.tile_mut(1).unwrap().owner = Some("p1".to_string());
        assert!(!board.owns_full_group("p1", "brown"));

        board.tile_mut(3).unwrap().owner = Some("p1".to_string());
        assert!(board.owns_full_group("p1", "brown"));
        assert_eq!(board.owned_count("p1", TileKind::Property), 2);
    }

    #[test]
    fn test_release_all_clears_houses() {
        let mut board = Board::world();
        board.tile_mut(1).unwrap().owner = Some("p1".to_string());
        board.tile_mut(1).unwrap().house_count = 3;

        board.release_all("p1");
        assert!(board.tile(1).unwrap().owner.is_none());
        assert_eq!(board.tile(1).unwrap().house_count, 0);
    }

    #[test]
    fn test_tile_deserializes_from_map_json() {
        let json = r#"{
            "id": 1,
            "name": "Salvador",
            "type": "PROPERTY",
            "price": 60,
            "rent": [2, 10, 30, 90, 160, 250],
            "group": "brown",
            "buildCost": 50
        }"#;
        let tile: Tile = serde_json::from_str(json).unwrap();
        assert_eq!(tile.kind, TileKind::Property);
        assert_eq!(tile.build_cost, Some(50));
        assert!(tile.owner.is_none());
    }
}
