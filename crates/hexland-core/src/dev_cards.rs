//! Development cards: the draw pile and per-player holdings.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Total cards in a fresh deck
pub const DECK_SIZE: usize = 25;

/// Development card types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevelopmentCard {
    /// Move robber and steal, counts toward largest army
    Knight,
    /// Worth 1 VP, hidden from opponents
    VictoryPoint,
    /// Build 2 roads for free
    RoadBuilding,
    /// Take 1 or 2 resources from the bank
    YearOfPlenty,
    /// Collect every opponent's cards of one kind
    Monopoly,
}

impl DevelopmentCard {
    pub const ALL: [DevelopmentCard; 5] = [
        DevelopmentCard::Knight,
        DevelopmentCard::VictoryPoint,
        DevelopmentCard::RoadBuilding,
        DevelopmentCard::YearOfPlenty,
        DevelopmentCard::Monopoly,
    ];

    /// How many of this card a fresh deck holds
    pub fn deck_count(&self) -> u32 {
        match self {
            DevelopmentCard::Knight => 14,
            DevelopmentCard::VictoryPoint => 5,
            DevelopmentCard::RoadBuilding
            | DevelopmentCard::YearOfPlenty
            | DevelopmentCard::Monopoly => 2,
        }
    }
}

/// The shuffled draw pile. Cards are drawn without replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevelopmentDeck {
    cards: Vec<DevelopmentCard>,
}

impl DevelopmentDeck {
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut cards: Vec<DevelopmentCard> = DevelopmentCard::ALL
            .iter()
            .flat_map(|&card| std::iter::repeat(card).take(card.deck_count() as usize))
            .collect();
        cards.shuffle(rng);
        Self { cards }
    }

    /// Build a deck in draw order (first element drawn first)
    pub fn from_draw_order(mut cards: Vec<DevelopmentCard>) -> Self {
        cards.reverse();
        Self { cards }
    }

    pub fn draw(&mut self) -> Option<DevelopmentCard> {
        self.cards.pop()
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// A count per card kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardCounts {
    pub knight: u32,
    pub victory_point: u32,
    pub road_building: u32,
    pub year_of_plenty: u32,
    pub monopoly: u32,
}

impl CardCounts {
    pub fn get(&self, card: DevelopmentCard) -> u32 {
        match card {
            DevelopmentCard::Knight => self.knight,
            DevelopmentCard::VictoryPoint => self.victory_point,
            DevelopmentCard::RoadBuilding => self.road_building,
            DevelopmentCard::YearOfPlenty => self.year_of_plenty,
            DevelopmentCard::Monopoly => self.monopoly,
        }
    }

    fn slot_mut(&mut self, card: DevelopmentCard) -> &mut u32 {
        match card {
            DevelopmentCard::Knight => &mut self.knight,
            DevelopmentCard::VictoryPoint => &mut self.victory_point,
            DevelopmentCard::RoadBuilding => &mut self.road_building,
            DevelopmentCard::YearOfPlenty => &mut self.year_of_plenty,
            DevelopmentCard::Monopoly => &mut self.monopoly,
        }
    }

    pub fn total(&self) -> u32 {
        DevelopmentCard::ALL.iter().map(|&c| self.get(c)).sum()
    }
}

/// One player's development cards.
///
/// `bought_this_turn` is a subset of `in_hand`; those cards cannot be played
/// until the owner's next turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevCardHoldings {
    pub in_hand: CardCounts,
    pub played: CardCounts,
    pub bought_this_turn: CardCounts,
}

impl DevCardHoldings {
    /// Add a freshly bought card
    pub fn acquire(&mut self, card: DevelopmentCard) {
        *self.in_hand.slot_mut(card) += 1;
        *self.bought_this_turn.slot_mut(card) += 1;
    }

    /// Cards of this kind that may be played right now
    pub fn playable(&self, card: DevelopmentCard) -> u32 {
        self.in_hand.get(card) - self.bought_this_turn.get(card)
    }

    /// Move one card from hand to the played pile. Returns false if none is
    /// playable.
    pub fn play(&mut self, card: DevelopmentCard) -> bool {
        if self.playable(card) == 0 {
            return false;
        }
        *self.in_hand.slot_mut(card) -= 1;
        *self.played.slot_mut(card) += 1;
        true
    }

    pub fn end_turn(&mut self) {
        self.bought_this_turn = CardCounts::default();
    }

    /// Cards this player has taken out of the deck
    pub fn total_drawn(&self) -> u32 {
        self.in_hand.total() + self.played.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_standard_deck_composition() {
        let mut deck = DevelopmentDeck::shuffled(&mut StdRng::seed_from_u64(1));
        assert_eq!(deck.remaining(), DECK_SIZE);

        let mut counts = DevCardHoldings::default();
        while let Some(card) = deck.draw() {
            counts.acquire(card);
        }
        assert_eq!(counts.in_hand.knight, 14);
        assert_eq!(counts.in_hand.victory_point, 5);
        assert_eq!(counts.in_hand.road_building, 2);
        assert_eq!(counts.in_hand.year_of_plenty, 2);
        assert_eq!(counts.in_hand.monopoly, 2);
        assert!(deck.is_empty());
    }

    #[test]
    fn test_card_bought_this_turn_is_not_playable() {
        let mut holdings = DevCardHoldings::default();
        holdings.acquire(DevelopmentCard::Knight);
        assert_eq!(holdings.playable(DevelopmentCard::Knight), 0);
        assert!(!holdings.play(DevelopmentCard::Knight));

        holdings.end_turn();
        assert!(holdings.play(DevelopmentCard::Knight));
        assert_eq!(holdings.played.knight, 1);
        assert_eq!(holdings.in_hand.knight, 0);
        assert_eq!(holdings.total_drawn(), 1);
    }

    #[test]
    fn test_draw_order() {
        let mut deck = DevelopmentDeck::from_draw_order(vec![
            DevelopmentCard::Monopoly,
            DevelopmentCard::Knight,
        ]);
        assert_eq!(deck.draw(), Some(DevelopmentCard::Monopoly));
        assert_eq!(deck.draw(), Some(DevelopmentCard::Knight));
        assert_eq!(deck.draw(), None);
    }
}
