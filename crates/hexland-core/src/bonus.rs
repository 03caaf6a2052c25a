//! Contested two-point bonuses (longest road, largest army).

use crate::player::PlayerId;
use serde::{Deserialize, Serialize};

/// Victory points a bonus is worth while held
pub const BONUS_POINTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bonus {
    LongestRoad,
    LargestArmy,
}

/// Who holds a bonus given every player's score (indexed by player id).
///
/// Nobody below `minimum` can hold it. The holder keeps it while at the top,
/// including ties. Otherwise the unique top scorer takes it; a tie at the
/// top with the holder out of it leaves the bonus unheld.
pub fn holder_after(scores: &[u32], holder: Option<PlayerId>, minimum: u32) -> Option<PlayerId> {
    let best = scores.iter().copied().max().unwrap_or(0);
    if best < minimum {
        return None;
    }
    if let Some(h) = holder {
        if scores.get(h.index()) == Some(&best) {
            return Some(h);
        }
    }
    let mut leaders = scores
        .iter()
        .enumerate()
        .filter(|(_, score)| **score == best)
        .map(|(index, _)| PlayerId(index as u8));
    match (leaders.next(), leaders.next()) {
        (Some(leader), None) => Some(leader),
        _ => None,
    }
}
