//! Largest-army tracking.

use crate::bonus::holder_after;
use crate::player::{Player, PlayerId};

/// Knights needed to hold largest army
pub const MIN_LARGEST_ARMY: u32 = 3;

/// Largest-army holder after a knight play. The incumbent keeps the bonus
/// on a tie.
pub fn largest_army_holder(players: &[Player]) -> Option<PlayerId> {
    let knights: Vec<u32> = players.iter().map(|p| p.knights_played).collect();
    let holder = players.iter().find(|p| p.has_largest_army).map(|p| p.id);
    holder_after(&knights, holder, MIN_LARGEST_ARMY)
}
