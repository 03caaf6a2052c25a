//! Turn and phase state machine.
//!
//! The controller only tracks where the game is. It never looks at the board
//! or the ledger; the action processor checks preconditions and then calls
//! the transition methods here.

use crate::error::ActionError;
use crate::player::PlayerId;
use crate::topology::{TileId, VertexId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the placing player must put down next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStep {
    Settlement,
    Road,
}

/// How a game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    Won { winner: PlayerId },
    Aborted,
}

/// Current phase of the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    InitialPlacement { step: PlacementStep },
    AwaitingRoll,
    AwaitingDiscard,
    AwaitingRobberMove,
    AwaitingSteal,
    AwaitingFreeAction,
    Terminal { outcome: Outcome },
}

/// Sub-phases in which only one kind of action is accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForcedAction {
    AwaitingDiscard,
    AwaitingRobberMove,
    AwaitingSteal,
}

impl Phase {
    pub fn forced_action(&self) -> Option<ForcedAction> {
        match self {
            Phase::AwaitingDiscard => Some(ForcedAction::AwaitingDiscard),
            Phase::AwaitingRobberMove => Some(ForcedAction::AwaitingRobberMove),
            Phase::AwaitingSteal => Some(ForcedAction::AwaitingSteal),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Terminal { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnController {
    phase: Phase,
    player_count: u8,
    current: PlayerId,
    /// Snake order for initial placement: 0..n then n..0
    placement_order: Vec<PlayerId>,
    placement_cursor: usize,
    /// Settlement placed in the current placement sub-turn
    setup_settlement: Option<VertexId>,
    pending_discards: BTreeMap<PlayerId, u32>,
    steal_candidates: Vec<PlayerId>,
    pending_robber_tile: Option<TileId>,
    last_roll: Option<u8>,
    turn_number: u32,
}

impl TurnController {
    pub fn new(player_count: u8) -> Self {
        let forward = (0..player_count).map(PlayerId);
        let placement_order: Vec<PlayerId> = forward.clone().chain(forward.rev()).collect();
        Self {
            phase: Phase::InitialPlacement {
                step: PlacementStep::Settlement,
            },
            player_count,
            current: PlayerId(0),
            placement_order,
            placement_cursor: 0,
            setup_settlement: None,
            pending_discards: BTreeMap::new(),
            steal_candidates: Vec::new(),
            pending_robber_tile: None,
            last_roll: None,
            turn_number: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_player(&self) -> PlayerId {
        self.current
    }

    pub fn last_roll(&self) -> Option<u8> {
        self.last_roll
    }

    /// True once the current player has rolled this turn
    pub fn dice_rolled(&self) -> bool {
        self.last_roll.is_some()
    }

    pub fn turn_number(&self) -> u32 {
        self.turn_number
    }

    pub fn setup_settlement(&self) -> Option<VertexId> {
        self.setup_settlement
    }

    /// Second pass of the snake order
    pub fn is_second_placement_round(&self) -> bool {
        self.placement_cursor >= self.player_count as usize
    }

    /// Cards the player still owes after a 7, 0 if none
    pub fn pending_discard(&self, player: PlayerId) -> u32 {
        self.pending_discards.get(&player).copied().unwrap_or(0)
    }

    pub fn pending_discards(&self) -> &BTreeMap<PlayerId, u32> {
        &self.pending_discards
    }

    pub fn steal_candidates(&self) -> &[PlayerId] {
        &self.steal_candidates
    }

    pub fn pending_robber_tile(&self) -> Option<TileId> {
        self.pending_robber_tile
    }

    /// Fails unless it is `player`'s turn
    pub fn require_turn(&self, player: PlayerId) -> Result<(), ActionError> {
        if self.current != player {
            return Err(ActionError::PhaseViolation("not your turn"));
        }
        Ok(())
    }

    // ==================== Transitions ====================

    pub fn settlement_placed(&mut self, vertex: VertexId) {
        self.setup_settlement = Some(vertex);
        self.phase = Phase::InitialPlacement {
            step: PlacementStep::Road,
        };
    }

    /// Close a placement sub-turn and hand over to the next placer, or to
    /// the first regular turn once the snake order is used up
    pub fn road_placed(&mut self) {
        self.setup_settlement = None;
        self.placement_cursor += 1;
        match self.placement_order.get(self.placement_cursor) {
            Some(&next) => {
                self.current = next;
                self.phase = Phase::InitialPlacement {
                    step: PlacementStep::Settlement,
                };
            }
            None => {
                self.current = PlayerId(0);
                self.turn_number = 1;
                self.phase = Phase::AwaitingRoll;
            }
        }
    }

    /// A non-7 roll opens the free-action phase; a 7 waits for
    /// [`Self::begin_discards`]
    pub fn rolled(&mut self, total: u8) {
        self.last_roll = Some(total);
        if total != 7 {
            self.phase = Phase::AwaitingFreeAction;
        }
    }

    pub fn begin_discards(&mut self, obligations: BTreeMap<PlayerId, u32>) {
        self.pending_discards = obligations;
        self.phase = if self.pending_discards.is_empty() {
            Phase::AwaitingRobberMove
        } else {
            Phase::AwaitingDiscard
        };
    }

    pub fn discarded(&mut self, player: PlayerId) {
        self.pending_discards.remove(&player);
        if self.pending_discards.is_empty() {
            self.phase = Phase::AwaitingRobberMove;
        }
    }

    /// After the forced robber move: wait for a steal if anyone can be
    /// robbed
    pub fn robber_moved(&mut self, tile: TileId, candidates: Vec<PlayerId>) {
        if candidates.is_empty() {
            self.phase = Phase::AwaitingFreeAction;
        } else {
            self.pending_robber_tile = Some(tile);
            self.steal_candidates = candidates;
            self.phase = Phase::AwaitingSteal;
        }
    }

    pub fn stolen(&mut self) {
        self.steal_candidates.clear();
        self.pending_robber_tile = None;
        self.phase = Phase::AwaitingFreeAction;
    }

    /// Advance to the next player. Returns the new current player.
    pub fn end_turn(&mut self) -> PlayerId {
        self.current = PlayerId((self.current.0 + 1) % self.player_count);
        self.last_roll = None;
        self.turn_number += 1;
        self.phase = Phase::AwaitingRoll;
        self.current
    }

    pub fn finish(&mut self, outcome: Outcome) {
        self.pending_discards.clear();
        self.steal_candidates.clear();
        self.pending_robber_tile = None;
        self.phase = Phase::Terminal { outcome };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finish_placement(turn: &mut TurnController) -> Vec<PlayerId> {
        let mut order = Vec::new();
        while matches!(turn.phase(), Phase::InitialPlacement { .. }) {
            order.push(turn.current_player());
            turn.settlement_placed(VertexId(0));
            turn.road_placed();
        }
        order
    }

    #[test]
    fn test_snake_placement_order() {
        let mut turn = TurnController::new(3);
        let order = finish_placement(&mut turn);
        let ids: Vec<u8> = order.iter().map(|p| p.0).collect();
        assert_eq!(ids, vec![0, 1, 2, 2, 1, 0]);
        assert_eq!(turn.phase(), Phase::AwaitingRoll);
        assert_eq!(turn.current_player(), PlayerId(0));
    }

    #[test]
    fn test_second_round_flag() {
        let mut turn = TurnController::new(2);
        assert!(!turn.is_second_placement_round());
        turn.settlement_placed(VertexId(0));
        turn.road_placed();
        turn.settlement_placed(VertexId(2));
        turn.road_placed();
        assert!(turn.is_second_placement_round());
        assert_eq!(turn.current_player(), PlayerId(1));
    }

    #[test]
    fn test_seven_with_discards() {
        let mut turn = TurnController::new(2);
        finish_placement(&mut turn);
        turn.rolled(7);
        assert_eq!(turn.phase(), Phase::AwaitingRoll);

        turn.begin_discards(BTreeMap::from([(PlayerId(0), 4), (PlayerId(1), 5)]));
        assert_eq!(turn.phase().forced_action(), Some(ForcedAction::AwaitingDiscard));
        assert_eq!(turn.pending_discard(PlayerId(0)), 4);

        turn.discarded(PlayerId(1));
        assert_eq!(turn.phase(), Phase::AwaitingDiscard);
        turn.discarded(PlayerId(0));
        assert_eq!(turn.phase(), Phase::AwaitingRobberMove);

        turn.robber_moved(TileId(3), vec![PlayerId(1)]);
        assert_eq!(turn.phase(), Phase::AwaitingSteal);
        assert_eq!(turn.pending_robber_tile(), Some(TileId(3)));
        turn.stolen();
        assert_eq!(turn.phase(), Phase::AwaitingFreeAction);
    }

    #[test]
    fn test_end_turn_wraps() {
        let mut turn = TurnController::new(2);
        finish_placement(&mut turn);
        turn.rolled(5);
        assert_eq!(turn.phase(), Phase::AwaitingFreeAction);
        assert_eq!(turn.end_turn(), PlayerId(1));
        assert!(!turn.dice_rolled());
        turn.rolled(8);
        assert_eq!(turn.end_turn(), PlayerId(0));
        assert!(turn.require_turn(PlayerId(1)).is_err());
    }

    #[test]
    fn test_phase_wire_shape() {
        let phase = Phase::Terminal {
            outcome: Outcome::Won {
                winner: PlayerId(1),
            },
        };
        assert_eq!(
            serde_json::to_value(phase).unwrap(),
            serde_json::json!({"phase": "terminal", "outcome": {"result": "won", "winner": 1}})
        );
    }
}
