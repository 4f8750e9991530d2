//! Treasure and surprise card decks.
//!
//! Deck content is configuration: external decks load from the same JSON
//! record shape the map data files use (`{text, action, value?, targetId?}`)
//! and are decoded into typed effects at the boundary.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;

/// What drawing a card does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardEffect {
    /// Credit the drawing player.
    AddCash(i64),
    /// Charge the drawing player (debt allowed).
    SubCash(i64),
    /// Straight to prison.
    GoToJail,
    /// Relocate to a tile; landing is resolved there.
    MoveTo(usize),
}

/// A single drawable card.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawCard")]
pub struct Card {
    pub text: String,
    pub effect: CardEffect,
}

/// On-disk card record, validated into [`Card`] on load.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCard {
    text: String,
    action: String,
    #[serde(default)]
    value: Option<i64>,
    #[serde(default)]
    target_id: Option<usize>,
}

#[derive(Debug, Error)]
pub enum DeckError {
    #[error("unknown card action: {0}")]
    UnknownAction(String),

    #[error("card action {0} is missing its value")]
    MissingValue(String),

    #[error("deck failed to parse: {0}")]
    Parse(#[from] serde_json::Error),
}

impl TryFrom<RawCard> for Card {
    type Error = DeckError;

    fn try_from(raw: RawCard) -> Result<Self, Self::Error> {
        let effect = match raw.action.as_str() {
            "ADD_CASH" => CardEffect::AddCash(
                raw.value
                    .ok_or_else(|| DeckError::MissingValue(raw.action.clone()))?,
            ),
            "SUB_CASH" => CardEffect::SubCash(
                raw.value
                    .ok_or_else(|| DeckError::MissingValue(raw.action.clone()))?,
            ),
            "GO_TO_JAIL" => CardEffect::GoToJail,
            "MOVE_TO" => CardEffect::MoveTo(
                raw.target_id
                    .ok_or_else(|| DeckError::MissingValue(raw.action.clone()))?,
            ),
            other => return Err(DeckError::UnknownAction(other.to_string())),
        };
        Ok(Card {
            text: raw.text,
            effect,
        })
    }
}

/// An ordered card list drawn from uniformly at random.
#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// Parse an external deck from its JSON record list.
    pub fn from_json(json: &str) -> Result<Self, DeckError> {
        let cards: Vec<Card> = serde_json::from_str(json)?;
        Ok(Self { cards })
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Draw one card uniformly at random.
    pub fn draw<R: Rng>(&self, rng: &mut R) -> Option<&Card> {
        self.cards.choose(rng)
    }

    /// Built-in treasure deck (mostly credits).
    pub fn treasure() -> Self {
        Self {
            cards: vec![
                card("Bank error in your favor. Collect $200", CardEffect::AddCash(200)),
                card("Tax refund. Collect $20", CardEffect::AddCash(20)),
                card("You won a crossword competition. Collect $100", CardEffect::AddCash(100)),
                card("Life insurance matures. Collect $100", CardEffect::AddCash(100)),
                card("Doctor's fee. Pay $50", CardEffect::SubCash(50)),
                card("Hospital fees. Pay $100", CardEffect::SubCash(100)),
                card("Go straight to Prison", CardEffect::GoToJail),
                card("Advance to Start", CardEffect::MoveTo(0)),
            ],
        }
    }

    /// Built-in surprise deck (riskier spread).
    pub fn surprise() -> Self {
        Self {
            cards: vec![
                card("Your investments pay off. Collect $150", CardEffect::AddCash(150)),
                card("Speeding fine. Pay $15", CardEffect::SubCash(15)),
                card("Pay school fees of $150", CardEffect::SubCash(150)),
                card("You are assessed for street repairs. Pay $40", CardEffect::SubCash(40)),
                card("Go straight to Prison", CardEffect::GoToJail),
                card("Take a trip to TLV Airport", CardEffect::MoveTo(5)),
                card("Advance to Paris", CardEffect::MoveTo(29)),
                card("Advance to Start", CardEffect::MoveTo(0)),
            ],
        }
    }
}

fn card(text: &str, effect: CardEffect) -> Card {
    Card {
        text: text.to_string(),
        effect,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_decks_are_nonempty() {
        assert!(!Deck::treasure().is_empty());
        assert!(!Deck::surprise().is_empty());
    }

    #[test]
    fn test_deck_parses_external_record_shape() {
        let json = r#"[
            {"text": "Collect $50", "action": "ADD_CASH", "value": 50},
            {"text": "Pay $20", "action": "SUB_CASH", "value": 20},
            {"text": "To Prison", "action": "GO_TO_JAIL"},
            {"text": "Advance to Start", "action": "MOVE_TO", "targetId": 0}
        ]"#;
        let deck = Deck::from_json(json).unwrap();
        assert_eq!(deck.len(), 4);
    }

    #[test]
    fn test_deck_rejects_unknown_action() {
        let json = r#"[{"text": "??", "action": "TELEPORT"}]"#;
        assert!(Deck::from_json(json).is_err());
    }

    #[test]
    fn test_deck_rejects_missing_value() {
        let json = r#"[{"text": "Collect", "action": "ADD_CASH"}]"#;
        assert!(Deck::from_json(json).is_err());
    }

    #[test]
    fn test_draw_returns_a_deck_card() {
        let deck = Deck::treasure();
        let mut rng = rand::thread_rng();
        let drawn = deck.draw(&mut rng).unwrap();
        assert!(deck.cards.iter().any(|c| c.text == drawn.text));
    }
}
