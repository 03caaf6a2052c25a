//! Longest-road measurement.

use crate::board::Board;
use crate::bonus::holder_after;
use crate::player::{Player, PlayerId};
use crate::topology::VertexId;

/// Minimum road length to hold the longest-road bonus
pub const MIN_LONGEST_ROAD: u32 = 5;

/// Length of the player's longest trail: a walk over the player's roads
/// that never reuses an edge and never passes through a vertex holding
/// another player's building.
pub fn longest_road(board: &Board, player: PlayerId) -> u32 {
    let topology = board.topology();
    let mut used = vec![false; topology.edges.len()];
    let mut best = 0;

    for edge in board.roads_of(player) {
        used[edge.index()] = true;
        for end in topology.edges[edge.index()].vertices {
            best = best.max(extend(board, player, end, 1, &mut used));
        }
        used[edge.index()] = false;
    }

    best
}

/// Depth-first extension of a trail that currently ends at `at`
fn extend(board: &Board, player: PlayerId, at: VertexId, length: u32, used: &mut [bool]) -> u32 {
    if board.building(at).owner().is_some_and(|owner| owner != player) {
        return length;
    }

    let topology = board.topology();
    let mut best = length;
    for &edge in &topology.vertices[at.index()].edges {
        if used[edge.index()] || board.road_owner(edge) != Some(player) {
            continue;
        }
        used[edge.index()] = true;
        let next = topology.edges[edge.index()].other_end(at);
        best = best.max(extend(board, player, next, length + 1, used));
        used[edge.index()] = false;
    }
    best
}

/// Longest road of every player, indexed by player id
pub fn road_lengths(board: &Board, player_count: usize) -> Vec<u32> {
    (0..player_count)
        .map(|p| longest_road(board, PlayerId(p as u8)))
        .collect()
}

/// Longest-road holder given fresh lengths (indexed by player id).
///
/// A holder still at 5 or more loses the card when two others pass them
/// with equal lengths; nobody holds it until the tie breaks.
pub fn longest_road_holder(lengths: &[u32], players: &[Player]) -> Option<PlayerId> {
    let holder = players.iter().find(|p| p.has_longest_road).map(|p| p.id);
    holder_after(lengths, holder, MIN_LONGEST_ROAD)
}
