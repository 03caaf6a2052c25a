//! Error types for the engine.

use crate::topology::TileId;
use serde::Serialize;
use thiserror::Error;

/// Why an action was rejected.
///
/// Every class except `InvariantViolation` is an ordinary rejection: the game
/// state is untouched and the submitter may try something else.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum ActionError {
    #[error("not allowed now: {0}")]
    PhaseViolation(&'static str),

    #[error("insufficient resources: {0}")]
    InsufficientResources(&'static str),

    #[error("out of stock: {0}")]
    InsufficientStock(&'static str),

    #[error("ownership: {0}")]
    OwnershipViolation(&'static str),

    #[error("distance rule: {0}")]
    DistanceRuleViolation(&'static str),

    #[error("bank shortage: {0}")]
    BankShortage(&'static str),

    #[error("invalid target: {0}")]
    InvalidTarget(&'static str),

    /// The game aggregate is corrupt. The game has been aborted.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl ActionError {
    /// Stable class name used on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            ActionError::PhaseViolation(_) => "phase_violation",
            ActionError::InsufficientResources(_) => "insufficient_resources",
            ActionError::InsufficientStock(_) => "insufficient_stock",
            ActionError::OwnershipViolation(_) => "ownership_violation",
            ActionError::DistanceRuleViolation(_) => "distance_rule_violation",
            ActionError::BankShortage(_) => "bank_shortage",
            ActionError::InvalidTarget(_) => "invalid_target",
            ActionError::InvariantViolation(_) => "invariant_violation",
        }
    }

    /// Human-readable reason without the class prefix
    pub fn reason(&self) -> &str {
        match self {
            ActionError::PhaseViolation(r)
            | ActionError::InsufficientResources(r)
            | ActionError::InsufficientStock(r)
            | ActionError::OwnershipViolation(r)
            | ActionError::DistanceRuleViolation(r)
            | ActionError::BankShortage(r)
            | ActionError::InvalidTarget(r) => *r,
            ActionError::InvariantViolation(r) => r.as_str(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ActionError::InvariantViolation(_))
    }
}

/// An explicit board layout that is not a legal board
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("expected 19 terrain tiles and 19 token slots, got {terrain} and {tokens}")]
    WrongTileCount { terrain: usize, tokens: usize },

    #[error("terrain mix does not match the standard set")]
    TerrainMix,

    #[error("number tokens do not match the standard set")]
    TokenMix,

    #[error("desert tile {0} carries a number token")]
    DesertToken(TileId),

    #[error("producing tile {0} has no number token")]
    MissingToken(TileId),

    #[error("tiles {0} and {1} touch and both carry a 6 or 8")]
    AdjacentHotTiles(TileId, TileId),
}

/// Game construction failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("a game needs 2 to 4 players, got {0}")]
    PlayerCount(usize),

    #[error(transparent)]
    Layout(#[from] LayoutError),
}
