//! Per-player snapshots.
//!
//! A [`PlayerView`] shows the whole board and the viewer's own hand and
//! cards. Opponents are reduced to counts and public fields.

use crate::actions::TradeOffer;
use crate::board::VertexBuilding;
use crate::dev_cards::{CardCounts, DevCardHoldings};
use crate::game::Game;
use crate::player::{PieceStock, Player, PlayerId};
use crate::resources::ResourceHand;
use crate::topology::{EdgeNode, PortKind, PortLayout, TileId, TileNode, VertexNode};
use crate::turn::{ForcedAction, Phase};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileView {
    #[serde(flatten)]
    pub node: TileNode,
    pub has_robber: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    Settlement,
    City,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VertexView {
    #[serde(flatten)]
    pub node: VertexNode,
    pub building: Option<BuildingKind>,
    pub owner: Option<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeView {
    #[serde(flatten)]
    pub node: EdgeNode,
    pub owner: Option<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardView {
    pub tiles: Vec<TileView>,
    pub vertices: Vec<VertexView>,
    pub edges: Vec<EdgeView>,
    pub robber: TileId,
    pub port_layout: PortLayout,
}

/// What every player can see about a player
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicPlayerView {
    pub id: PlayerId,
    pub name: String,
    pub resource_count: u32,
    pub development_card_count: u32,
    /// Excludes unrevealed victory-point cards
    pub victory_points: u32,
    pub knights_played: u32,
    pub played_development_cards: CardCounts,
    pub longest_road_length: u32,
    pub has_longest_road: bool,
    pub has_largest_army: bool,
    pub played_development_card_this_turn: bool,
    pub dice_rolled_this_turn: bool,
    pub has_turn: bool,
    pub remaining: PieceStock,
    pub ports: Vec<PortKind>,
}

/// The viewer's own record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrivatePlayerView {
    #[serde(flatten)]
    pub public: PublicPlayerView,
    pub resources: ResourceHand,
    pub development_cards: DevCardHoldings,
    pub total_victory_points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PlayerRecordView {
    Private(PrivatePlayerView),
    Public(PublicPlayerView),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerView {
    pub viewer: PlayerId,
    pub board: BoardView,
    pub players: BTreeMap<PlayerId, PlayerRecordView>,
    pub bank: ResourceHand,
    pub development_cards_remaining: usize,
    pub current_turn: PlayerId,
    pub current_roll: Option<u8>,
    pub turn_number: u32,
    pub phase: Phase,
    pub forced_action: Option<ForcedAction>,
    /// Cards the viewer still owes after a 7
    pub must_discard: u32,
    pub robber_candidates: Vec<PlayerId>,
    pub pending_robber_tile: Option<TileId>,
    pub open_trade: Option<TradeOffer>,
}

impl PlayerView {
    pub fn project(game: &Game, viewer: PlayerId) -> Self {
        let turn = game.turn();
        let players = game
            .players()
            .iter()
            .map(|p| {
                let public = public_record(game, p);
                let record = if p.id == viewer {
                    PlayerRecordView::Private(PrivatePlayerView {
                        public,
                        resources: game.ledger().hand(p.id),
                        development_cards: p.dev_cards,
                        total_victory_points: p.victory_points,
                    })
                } else {
                    PlayerRecordView::Public(public)
                };
                (p.id, record)
            })
            .collect();

        Self {
            viewer,
            board: board_view(game),
            players,
            bank: *game.ledger().bank(),
            development_cards_remaining: game.development_cards_remaining(),
            current_turn: turn.current_player(),
            current_roll: turn.last_roll(),
            turn_number: turn.turn_number(),
            phase: turn.phase(),
            forced_action: turn.phase().forced_action(),
            must_discard: turn.pending_discard(viewer),
            robber_candidates: turn.steal_candidates().to_vec(),
            pending_robber_tile: turn.pending_robber_tile(),
            open_trade: game.open_trade().cloned(),
        }
    }

    /// The viewer's own record
    pub fn me(&self) -> Option<&PrivatePlayerView> {
        match self.players.get(&self.viewer) {
            Some(PlayerRecordView::Private(record)) => Some(record),
            _ => None,
        }
    }
}

fn public_record(game: &Game, player: &Player) -> PublicPlayerView {
    let turn = game.turn();
    let has_turn = turn.current_player() == player.id && !turn.phase().is_terminal();
    PublicPlayerView {
        id: player.id,
        name: player.name.clone(),
        resource_count: game.ledger().hand(player.id).total(),
        development_card_count: player.dev_cards.in_hand.total(),
        victory_points: player.public_victory_points(),
        knights_played: player.knights_played,
        played_development_cards: player.dev_cards.played,
        longest_road_length: player.longest_road_length,
        has_longest_road: player.has_longest_road,
        has_largest_army: player.has_largest_army,
        played_development_card_this_turn: player.played_dev_card_this_turn,
        dice_rolled_this_turn: has_turn && turn.dice_rolled(),
        has_turn,
        remaining: player.stock,
        ports: player.ports.clone(),
    }
}

fn board_view(game: &Game) -> BoardView {
    let board = game.board();
    let topology = board.topology();
    BoardView {
        tiles: topology
            .tiles
            .iter()
            .map(|t| TileView {
                node: t.clone(),
                has_robber: t.id == board.robber(),
            })
            .collect(),
        vertices: topology
            .vertices
            .iter()
            .map(|v| {
                let building = board.building(v.id);
                VertexView {
                    node: v.clone(),
                    building: match building {
                        VertexBuilding::Empty => None,
                        VertexBuilding::Settlement(_) => Some(BuildingKind::Settlement),
                        VertexBuilding::City(_) => Some(BuildingKind::City),
                    },
                    owner: building.owner(),
                }
            })
            .collect(),
        edges: topology
            .edges
            .iter()
            .map(|e| EdgeView {
                node: e.clone(),
                owner: board.road_owner(e.id),
            })
            .collect(),
        robber: board.robber(),
        port_layout: topology.port_layout,
    }
}
