//! Enumeration of the actions a player could submit right now.
//!
//! The list is not exhaustive where the choice space is large: discards are
//! one canonical choice, year of plenty and bank trades are listed for a
//! single card, road building for a single road. Every listed action is
//! accepted by [`Game::apply`].

use crate::actions::Action;
use crate::dev_cards::DevelopmentCard;
use crate::game::Game;
use crate::player::PlayerId;
use crate::resources::{costs, Resource, ResourceHand};
use crate::turn::{Phase, PlacementStep};

impl Game {
    pub fn legal_actions(&self, player: PlayerId) -> Vec<Action> {
        let mut actions = Vec::new();
        let Some(record) = self.player(player) else {
            return actions;
        };
        let is_current = self.turn.current_player() == player;

        match self.turn.phase() {
            Phase::Terminal { .. } => {}

            Phase::InitialPlacement { step } => {
                if !is_current {
                    return actions;
                }
                match step {
                    PlacementStep::Settlement => {
                        for vertex_id in self.board.valid_settlement_spots(player, true) {
                            actions.push(Action::PlaceInitialSettlement { vertex_id });
                        }
                    }
                    PlacementStep::Road => {
                        if let Some(settlement) = self.turn.setup_settlement() {
                            let topology = self.board.topology();
                            for &edge_id in &topology.vertices[settlement.index()].edges {
                                if self.board.road_owner(edge_id).is_none() {
                                    actions.push(Action::PlaceInitialRoad { edge_id });
                                }
                            }
                        }
                    }
                }
            }

            Phase::AwaitingRoll => {
                if is_current {
                    actions.push(Action::RollDice);
                }
            }

            Phase::AwaitingDiscard => {
                let owed = self.turn.pending_discard(player);
                if owed > 0 {
                    actions.push(Action::DiscardResources {
                        resources: canonical_discard(self.ledger.hand(player), owed),
                    });
                }
            }

            Phase::AwaitingRobberMove => {
                if is_current {
                    for tile in &self.board.topology().tiles {
                        if tile.id != self.board.robber() {
                            actions.push(Action::MoveRobber {
                                target_tile: tile.id,
                            });
                        }
                    }
                }
            }

            Phase::AwaitingSteal => {
                if is_current {
                    for &victim_id in self.turn.steal_candidates() {
                        actions.push(Action::RobberSteal { victim_id });
                    }
                }
            }

            Phase::AwaitingFreeAction => {
                if !is_current {
                    if let Some(trade) = &self.open_trade {
                        if trade.from != player
                            && self.ledger.hand(player).can_afford(&trade.request)
                            && self.ledger.hand(trade.from).can_afford(&trade.offer)
                        {
                            actions.push(Action::AcceptTrade {
                                trader_id: trade.from,
                                offer: trade.offer,
                                request: trade.request,
                            });
                        }
                    }
                    return actions;
                }

                let hand = self.ledger.hand(player);

                if record.stock.roads > 0 && hand.can_afford(&costs::road()) {
                    for edge_id in self.board.valid_road_spots(player) {
                        actions.push(Action::PlaceRoad { edge_id });
                    }
                }
                if record.stock.settlements > 0 && hand.can_afford(&costs::settlement()) {
                    for vertex_id in self.board.valid_settlement_spots(player, false) {
                        actions.push(Action::PlaceSettlement { vertex_id });
                    }
                }
                if record.stock.cities > 0 && hand.can_afford(&costs::city()) {
                    for vertex_id in self.board.valid_city_spots(player) {
                        actions.push(Action::PlaceCity { vertex_id });
                    }
                }
                if !self.deck.is_empty() && hand.can_afford(&costs::development_card()) {
                    actions.push(Action::BuyDevelopmentCard);
                }

                self.push_card_plays(player, &mut actions);
                self.push_bank_trades(player, hand, &mut actions);

                actions.push(Action::EndTurn);
            }
        }

        actions
    }

    fn push_card_plays(&self, player: PlayerId, actions: &mut Vec<Action>) {
        let can_play = |card| self.check_card_play(player, card).is_ok();

        if can_play(DevelopmentCard::Knight) {
            for tile in &self.board.topology().tiles {
                if tile.id == self.board.robber() {
                    continue;
                }
                let candidates = self.steal_candidates(tile.id, player);
                if candidates.is_empty() {
                    actions.push(Action::PlayKnightCard {
                        target_tile: tile.id,
                        victim_id: None,
                    });
                }
                for victim in candidates {
                    actions.push(Action::PlayKnightCard {
                        target_tile: tile.id,
                        victim_id: Some(victim),
                    });
                }
            }
        }

        if can_play(DevelopmentCard::RoadBuilding) && self.players[player.index()].stock.roads > 0 {
            for edge_id in self.board.valid_road_spots(player) {
                actions.push(Action::PlayRoadBuildingCard {
                    edge_ids: vec![edge_id],
                });
            }
        }

        if can_play(DevelopmentCard::YearOfPlenty) {
            for resource in Resource::ALL {
                if self.ledger.bank().get(resource) > 0 {
                    actions.push(Action::PlayYearOfPlentyCard {
                        resources: vec![resource],
                    });
                }
            }
        }

        if can_play(DevelopmentCard::Monopoly) {
            for resource in Resource::ALL {
                actions.push(Action::PlayMonopolyCard { resource });
            }
        }
    }

    fn push_bank_trades(&self, player: PlayerId, hand: ResourceHand, actions: &mut Vec<Action>) {
        let record = &self.players[player.index()];
        for give in Resource::ALL {
            let ratio = record.trade_ratio(give);
            if hand.get(give) < ratio {
                continue;
            }
            for take in Resource::ALL {
                if take != give && self.ledger.bank().get(take) > 0 {
                    actions.push(Action::BankTrade {
                        offer: ResourceHand::single(give, ratio),
                        request: ResourceHand::single(take, 1),
                    });
                }
            }
        }
    }
}

/// Discard `owed` cards, taking from the largest piles first
fn canonical_discard(hand: ResourceHand, owed: u32) -> ResourceHand {
    let mut remaining = hand;
    let mut discard = ResourceHand::new();
    for _ in 0..owed {
        let Some(largest) = Resource::ALL
            .into_iter()
            .filter(|&r| remaining.get(r) > 0)
            .max_by_key(|&r| remaining.get(r))
        else {
            break;
        };
        remaining.set(largest, remaining.get(largest) - 1);
        discard.add(largest, 1);
    }
    discard
}
