//! Game configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub victory_points_to_win: u32,
    /// Hands strictly larger than this lose half on a 7
    pub discard_threshold: u32,
    /// Seeds the board, deck, dice and steals. `None` draws from the OS.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            victory_points_to_win: 10,
            discard_threshold: 7,
            seed: None,
        }
    }
}

impl GameConfig {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }
}
