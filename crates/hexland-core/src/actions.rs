//! Game actions that players can submit and the events they produce.
//!
//! Actions travel as JSON objects tagged by a `type` field, e.g.
//! `{"type": "place_road", "edge_id": 19}`.

use crate::bonus::Bonus;
use crate::dev_cards::DevelopmentCard;
use crate::error::ActionError;
use crate::player::PlayerId;
use crate::resources::{Resource, ResourceHand};
use crate::topology::{EdgeId, TileId, VertexId};
use serde::{Deserialize, Serialize};

/// All possible actions a player can take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    // ==================== Initial Placement ====================
    PlaceInitialSettlement {
        vertex_id: VertexId,
    },
    /// Must touch the settlement placed in the same sub-turn
    PlaceInitialRoad {
        edge_id: EdgeId,
    },

    // ==================== Turn Actions ====================
    RollDice,
    EndTurn,

    // ==================== Forced Phases ====================
    /// Give back exactly the owed number of cards after a 7
    DiscardResources {
        resources: ResourceHand,
    },
    MoveRobber {
        target_tile: TileId,
    },
    RobberSteal {
        victim_id: PlayerId,
    },

    // ==================== Building ====================
    PlaceRoad {
        edge_id: EdgeId,
    },
    PlaceSettlement {
        vertex_id: VertexId,
    },
    PlaceCity {
        vertex_id: VertexId,
    },
    BuyDevelopmentCard,

    // ==================== Development Cards ====================
    /// Move the robber and steal in one step. `victim_id` must be given
    /// exactly when somebody at the target can be robbed.
    PlayKnightCard {
        target_tile: TileId,
        #[serde(default)]
        victim_id: Option<PlayerId>,
    },
    PlayRoadBuildingCard {
        edge_ids: Vec<EdgeId>,
    },
    PlayYearOfPlentyCard {
        resources: Vec<Resource>,
    },
    PlayMonopolyCard {
        resource: Resource,
    },

    // ==================== Trading ====================
    BankTrade {
        offer: ResourceHand,
        request: ResourceHand,
    },
    ProposeTrade {
        offer: ResourceHand,
        request: ResourceHand,
    },
    /// `offer` and `request` repeat the proposer's terms as seen from the
    /// proposer
    AcceptTrade {
        trader_id: PlayerId,
        offer: ResourceHand,
        request: ResourceHand,
    },
}

impl Action {
    /// Resource hands carried by the action
    fn hands(&self) -> Vec<&ResourceHand> {
        match self {
            Action::DiscardResources { resources } => vec![resources],
            Action::BankTrade { offer, request }
            | Action::ProposeTrade { offer, request }
            | Action::AcceptTrade { offer, request, .. } => vec![offer, request],
            _ => Vec::new(),
        }
    }

    /// Reject hands whose card count overflows. No real hand comes close.
    pub fn check_counts(&self) -> Result<(), ActionError> {
        if self.hands().iter().any(|h| h.checked_total().is_none()) {
            return Err(ActionError::InvalidTarget("resource count out of range"));
        }
        Ok(())
    }

    /// Decode an action envelope. Unknown types and malformed fields are
    /// rejected as invalid targets.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ActionError> {
        serde_json::from_value(value)
            .map_err(|_| ActionError::InvalidTarget("unrecognized action envelope"))
    }

    /// Snake-case name matching the envelope's `type` field
    pub fn name(&self) -> &'static str {
        match self {
            Action::PlaceInitialSettlement { .. } => "place_initial_settlement",
            Action::PlaceInitialRoad { .. } => "place_initial_road",
            Action::RollDice => "roll_dice",
            Action::EndTurn => "end_turn",
            Action::DiscardResources { .. } => "discard_resources",
            Action::MoveRobber { .. } => "move_robber",
            Action::RobberSteal { .. } => "robber_steal",
            Action::PlaceRoad { .. } => "place_road",
            Action::PlaceSettlement { .. } => "place_settlement",
            Action::PlaceCity { .. } => "place_city",
            Action::BuyDevelopmentCard => "buy_development_card",
            Action::PlayKnightCard { .. } => "play_knight_card",
            Action::PlayRoadBuildingCard { .. } => "play_road_building_card",
            Action::PlayYearOfPlentyCard { .. } => "play_year_of_plenty_card",
            Action::PlayMonopolyCard { .. } => "play_monopoly_card",
            Action::BankTrade { .. } => "bank_trade",
            Action::ProposeTrade { .. } => "propose_trade",
            Action::AcceptTrade { .. } => "accept_trade",
        }
    }
}

/// The open player-to-player proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOffer {
    pub from: PlayerId,
    /// What the proposer gives
    pub offer: ResourceHand,
    /// What the proposer wants back
    pub request: ResourceHand,
}

impl TradeOffer {
    /// Non-empty on both sides with no kind on both sides
    pub fn is_well_formed(&self) -> bool {
        !self.offer.is_empty() && !self.request.is_empty() && !self.offer.overlaps(&self.request)
    }
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    DiceRolled {
        player: PlayerId,
        dice: (u8, u8),
        total: u8,
    },

    /// Resources paid out after a roll
    ResourcesDistributed {
        distributions: Vec<(PlayerId, Resource, u32)>,
    },

    /// Demand for a kind exceeded the bank, so nobody received it
    ResourceShortage {
        resource: Resource,
        demanded: u32,
        available: u32,
    },

    DiscardsRequired {
        obligations: Vec<(PlayerId, u32)>,
    },

    CardsDiscarded {
        player: PlayerId,
        count: u32,
    },

    SettlementBuilt {
        player: PlayerId,
        vertex: VertexId,
    },

    CityBuilt {
        player: PlayerId,
        vertex: VertexId,
    },

    RoadBuilt {
        player: PlayerId,
        edge: EdgeId,
    },

    /// Second-round placement income
    StartingResources {
        player: PlayerId,
        resources: ResourceHand,
    },

    DevelopmentCardPurchased {
        player: PlayerId,
    },

    DevelopmentCardPlayed {
        player: PlayerId,
        card: DevelopmentCard,
    },

    RobberMoved {
        player: PlayerId,
        from: TileId,
        to: TileId,
    },

    /// The stolen kind is only shown to the two players involved
    ResourceStolen {
        thief: PlayerId,
        victim: PlayerId,
        resource: Resource,
    },

    YearOfPlentyTaken {
        player: PlayerId,
        resources: ResourceHand,
    },

    MonopolyCollected {
        player: PlayerId,
        resource: Resource,
        total: u32,
    },

    TradeProposed {
        offer: TradeOffer,
    },

    TradeCompleted {
        proposer: PlayerId,
        acceptor: PlayerId,
    },

    BankTradeCompleted {
        player: PlayerId,
        gave: ResourceHand,
        received: ResourceHand,
    },

    BonusChanged {
        bonus: Bonus,
        previous: Option<PlayerId>,
        current: Option<PlayerId>,
    },

    TurnEnded {
        player: PlayerId,
        next_player: PlayerId,
    },

    GameWon {
        player: PlayerId,
        victory_points: u32,
    },

    GameAborted,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_envelopes_decode() {
        assert_eq!(
            Action::from_json(json!({"type": "place_road", "edge_id": 19})).unwrap(),
            Action::PlaceRoad { edge_id: EdgeId(19) }
        );
        assert_eq!(
            Action::from_json(json!({"type": "roll_dice"})).unwrap(),
            Action::RollDice
        );
        assert_eq!(
            Action::from_json(json!({
                "type": "bank_trade",
                "offer": {"ore": 2},
                "request": {"sheep": 1}
            }))
            .unwrap(),
            Action::BankTrade {
                offer: ResourceHand::single(Resource::Ore, 2),
                request: ResourceHand::single(Resource::Sheep, 1),
            }
        );
        assert_eq!(
            Action::from_json(json!({"type": "play_knight_card", "target_tile": 4})).unwrap(),
            Action::PlayKnightCard {
                target_tile: TileId(4),
                victim_id: None
            }
        );
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = Action::from_json(json!({"type": "teleport"})).unwrap_err();
        assert_eq!(err.kind(), "invalid_target");
        assert!(Action::from_json(json!({"edge_id": 3})).is_err());
    }

    #[test]
    fn test_name_matches_wire_tag() {
        let action = Action::PlayYearOfPlentyCard {
            resources: vec![Resource::Ore],
        };
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["type"], action.name());
    }

    #[test]
    fn test_trade_offer_shape() {
        let offer = TradeOffer {
            from: PlayerId(0),
            offer: ResourceHand::single(Resource::Ore, 1),
            request: ResourceHand::single(Resource::Ore, 1),
        };
        assert!(!offer.is_well_formed());
    }
}
