//! Per-player records.
//!
//! Resource hands live in the [`ResourceLedger`](crate::ledger::ResourceLedger)
//! so that every card movement goes through one place; everything else a
//! player owns is here.

use crate::bonus::Bonus;
use crate::dev_cards::{DevCardHoldings, DevelopmentCard};
use crate::resources::Resource;
use crate::topology::PortKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Player identifier, dense from 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u8);

impl PlayerId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Default bank-trade ratio without a port
pub const DEFAULT_TRADE_RATIO: u32 = 4;

/// Unplaced pieces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceStock {
    pub roads: u32,
    pub settlements: u32,
    pub cities: u32,
}

impl Default for PieceStock {
    fn default() -> Self {
        Self {
            roads: 15,
            settlements: 5,
            cities: 4,
        }
    }
}

/// A single player's state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub dev_cards: DevCardHoldings,
    pub stock: PieceStock,
    /// Everything the player scores, hidden victory-point cards included
    pub victory_points: u32,
    pub knights_played: u32,
    pub longest_road_length: u32,
    pub has_longest_road: bool,
    pub has_largest_army: bool,
    pub played_dev_card_this_turn: bool,
    pub ports: Vec<PortKind>,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            dev_cards: DevCardHoldings::default(),
            stock: PieceStock::default(),
            victory_points: 0,
            knights_played: 0,
            longest_road_length: 0,
            has_longest_road: false,
            has_largest_army: false,
            played_dev_card_this_turn: false,
            ports: Vec::new(),
        }
    }

    /// Victory-point cards opponents cannot see
    pub fn hidden_victory_points(&self) -> u32 {
        self.dev_cards.in_hand.get(DevelopmentCard::VictoryPoint)
    }

    /// Victory points visible to opponents
    pub fn public_victory_points(&self) -> u32 {
        self.victory_points - self.hidden_victory_points()
    }

    pub fn register_port(&mut self, port: PortKind) {
        if !self.ports.contains(&port) {
            self.ports.push(port);
        }
    }

    /// Best bank-trade ratio this player gets when giving `resource`
    pub fn trade_ratio(&self, resource: Resource) -> u32 {
        self.ports
            .iter()
            .filter(|p| match p {
                PortKind::Generic => true,
                PortKind::Specific(r) => *r == resource,
            })
            .map(|p| p.ratio())
            .min()
            .unwrap_or(DEFAULT_TRADE_RATIO)
    }

    pub fn holds(&self, bonus: Bonus) -> bool {
        match bonus {
            Bonus::LongestRoad => self.has_longest_road,
            Bonus::LargestArmy => self.has_largest_army,
        }
    }

    pub fn set_holds(&mut self, bonus: Bonus, held: bool) {
        match bonus {
            Bonus::LongestRoad => self.has_longest_road = held,
            Bonus::LargestArmy => self.has_largest_army = held,
        }
    }

    /// Reset per-turn flags
    pub fn end_turn(&mut self) {
        self.played_dev_card_this_turn = false;
        self.dev_cards.end_turn();
    }
}
