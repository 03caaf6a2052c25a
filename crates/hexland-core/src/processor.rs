//! Action handlers.
//!
//! Each handler checks every precondition before touching any state, so a
//! rejected action leaves the game exactly as it was.

use crate::actions::{Action, GameEvent, TradeOffer};
use crate::dev_cards::DevelopmentCard;
use crate::error::ActionError;
use crate::game::Game;
use crate::player::PlayerId;
use crate::resources::{costs, Resource, ResourceHand};
use crate::topology::{EdgeId, TileId, VertexId};
use crate::turn::{Phase, PlacementStep};
use rand::Rng;
use std::collections::BTreeMap;
use tracing::info;

impl Game {
    pub(crate) fn process(
        &mut self,
        player: PlayerId,
        action: Action,
        dice: Option<(u8, u8)>,
    ) -> Result<Vec<GameEvent>, ActionError> {
        match action {
            // ==================== Initial Placement ====================
            Action::PlaceInitialSettlement { vertex_id } => {
                self.place_initial_settlement(player, vertex_id)
            }
            Action::PlaceInitialRoad { edge_id } => self.place_initial_road(player, edge_id),

            // ==================== Turn Actions ====================
            Action::RollDice => self.roll_dice(player, dice),
            Action::EndTurn => self.end_turn(player),

            // ==================== Forced Phases ====================
            Action::DiscardResources { resources } => self.discard(player, resources),
            Action::MoveRobber { target_tile } => self.move_robber(player, target_tile),
            Action::RobberSteal { victim_id } => self.robber_steal(player, victim_id),

            // ==================== Building ====================
            Action::PlaceRoad { edge_id } => self.build_road(player, edge_id),
            Action::PlaceSettlement { vertex_id } => self.build_settlement(player, vertex_id),
            Action::PlaceCity { vertex_id } => self.build_city(player, vertex_id),
            Action::BuyDevelopmentCard => self.buy_development_card(player),

            // ==================== Development Cards ====================
            Action::PlayKnightCard {
                target_tile,
                victim_id,
            } => self.play_knight(player, target_tile, victim_id),
            Action::PlayRoadBuildingCard { edge_ids } => self.play_road_building(player, edge_ids),
            Action::PlayYearOfPlentyCard { resources } => {
                self.play_year_of_plenty(player, resources)
            }
            Action::PlayMonopolyCard { resource } => self.play_monopoly(player, resource),

            // ==================== Trading ====================
            Action::BankTrade { offer, request } => self.bank_trade(player, offer, request),
            Action::ProposeTrade { offer, request } => self.propose_trade(player, offer, request),
            Action::AcceptTrade {
                trader_id,
                offer,
                request,
            } => self.accept_trade(player, trader_id, offer, request),
        }
    }

    // ==================== Shared Checks ====================

    /// The current player in the free-action phase
    pub(crate) fn require_free_action(&self, player: PlayerId) -> Result<(), ActionError> {
        self.turn.require_turn(player)?;
        match self.turn.phase() {
            Phase::AwaitingFreeAction => Ok(()),
            Phase::AwaitingRoll => Err(ActionError::PhaseViolation("roll the dice first")),
            Phase::InitialPlacement { .. } => {
                Err(ActionError::PhaseViolation("initial placement is not finished"))
            }
            _ => Err(ActionError::PhaseViolation(
                "a forced action must be resolved first",
            )),
        }
    }

    /// Preconditions shared by every development-card play
    pub(crate) fn check_card_play(
        &self,
        player: PlayerId,
        card: DevelopmentCard,
    ) -> Result<(), ActionError> {
        self.require_free_action(player)?;
        let record = &self.players[player.index()];
        if record.played_dev_card_this_turn {
            return Err(ActionError::PhaseViolation(
                "a development card was already played this turn",
            ));
        }
        if record.dev_cards.playable(card) == 0 {
            return Err(ActionError::InsufficientStock(
                "no playable card of that kind",
            ));
        }
        Ok(())
    }

    /// Players the mover could rob at `tile`: a building on the tile and at
    /// least one card
    pub(crate) fn steal_candidates(&self, tile: TileId, mover: PlayerId) -> Vec<PlayerId> {
        self.board
            .players_adjacent_to_tile(tile)
            .into_iter()
            .filter(|&p| p != mover && !self.ledger.hand(p).is_empty())
            .collect()
    }

    fn check_robber_target(&self, tile: TileId) -> Result<(), ActionError> {
        if self.board.topology().tile(tile).is_none() {
            return Err(ActionError::InvalidTarget("no such tile"));
        }
        if tile == self.board.robber() {
            return Err(ActionError::InvalidTarget(
                "the robber must move to a different tile",
            ));
        }
        Ok(())
    }

    fn mark_card_played(&mut self, player: PlayerId, card: DevelopmentCard) -> GameEvent {
        let record = &mut self.players[player.index()];
        record.dev_cards.play(card);
        record.played_dev_card_this_turn = true;
        GameEvent::DevelopmentCardPlayed { player, card }
    }

    fn relocate_robber(&mut self, player: PlayerId, tile: TileId) -> GameEvent {
        let from = self.board.robber();
        self.board.move_robber(tile);
        GameEvent::RobberMoved {
            player,
            from,
            to: tile,
        }
    }

    /// Move one random card, weighted by the victim's hand
    fn steal(&mut self, thief: PlayerId, victim: PlayerId) -> Result<Option<GameEvent>, ActionError> {
        let Some(resource) = self.ledger.hand(victim).pick_weighted(&mut self.rng) else {
            return Ok(None);
        };
        self.ledger
            .transfer(victim, thief, &ResourceHand::single(resource, 1))?;
        Ok(Some(GameEvent::ResourceStolen {
            thief,
            victim,
            resource,
        }))
    }

    // ==================== Initial Placement ====================

    fn place_initial_settlement(
        &mut self,
        player: PlayerId,
        vertex: VertexId,
    ) -> Result<Vec<GameEvent>, ActionError> {
        if self.turn.phase()
            != (Phase::InitialPlacement {
                step: PlacementStep::Settlement,
            })
        {
            return Err(ActionError::PhaseViolation(
                "not placing an initial settlement now",
            ));
        }
        self.turn.require_turn(player)?;
        self.board.check_settlement(vertex, player, false)?;
        if self.players[player.index()].stock.settlements == 0 {
            return Err(ActionError::InsufficientStock("no settlements left"));
        }
        let income = if self.turn.is_second_placement_round() {
            self.board.starting_resources(vertex)
        } else {
            ResourceHand::new()
        };
        if !self.ledger.bank().can_afford(&income) {
            return Err(ActionError::BankShortage(
                "bank cannot pay the starting resources",
            ));
        }

        self.board.place_settlement(vertex, player);
        let port = self.board.port_at(vertex);
        let record = &mut self.players[player.index()];
        record.stock.settlements -= 1;
        record.victory_points += 1;
        if let Some(port) = port {
            record.register_port(port);
        }
        self.turn.settlement_placed(vertex);

        let mut events = vec![GameEvent::SettlementBuilt { player, vertex }];
        if !income.is_empty() {
            self.ledger.grant(player, &income)?;
            events.push(GameEvent::StartingResources {
                player,
                resources: income,
            });
        }
        Ok(events)
    }

    fn place_initial_road(
        &mut self,
        player: PlayerId,
        edge: EdgeId,
    ) -> Result<Vec<GameEvent>, ActionError> {
        if self.turn.phase()
            != (Phase::InitialPlacement {
                step: PlacementStep::Road,
            })
        {
            return Err(ActionError::PhaseViolation("not placing an initial road now"));
        }
        self.turn.require_turn(player)?;
        let Some(node) = self.board.topology().edge(edge) else {
            return Err(ActionError::InvalidTarget("no such edge"));
        };
        if self.board.road_owner(edge).is_some() {
            return Err(ActionError::OwnershipViolation("edge already has a road"));
        }
        let touches_new_settlement = self
            .turn
            .setup_settlement()
            .is_some_and(|v| node.vertices.contains(&v));
        if !touches_new_settlement {
            return Err(ActionError::OwnershipViolation(
                "road must touch the settlement just placed",
            ));
        }
        if self.players[player.index()].stock.roads == 0 {
            return Err(ActionError::InsufficientStock("no roads left"));
        }

        self.board.place_road(edge, player);
        self.players[player.index()].stock.roads -= 1;
        self.turn.road_placed();
        Ok(vec![GameEvent::RoadBuilt { player, edge }])
    }

    // ==================== Dice ====================

    fn roll_dice(
        &mut self,
        player: PlayerId,
        dice: Option<(u8, u8)>,
    ) -> Result<Vec<GameEvent>, ActionError> {
        self.turn.require_turn(player)?;
        if self.turn.phase() != Phase::AwaitingRoll {
            return Err(ActionError::PhaseViolation("dice already rolled this turn"));
        }

        let dice = match dice {
            Some(dice) => dice,
            None => (self.rng.gen_range(1..=6), self.rng.gen_range(1..=6)),
        };
        let total = dice.0 + dice.1;
        info!(%player, total, "dice rolled");

        let mut events = vec![GameEvent::DiceRolled {
            player,
            dice,
            total,
        }];
        self.turn.rolled(total);

        if total == 7 {
            let threshold = self.config.discard_threshold;
            let obligations: BTreeMap<PlayerId, u32> = self
                .players
                .iter()
                .map(|p| (p.id, self.ledger.hand(p.id).total()))
                .filter(|&(_, cards)| cards > threshold)
                .map(|(id, cards)| (id, cards / 2))
                .collect();
            if !obligations.is_empty() {
                events.push(GameEvent::DiscardsRequired {
                    obligations: obligations.iter().map(|(&p, &n)| (p, n)).collect(),
                });
            }
            self.turn.begin_discards(obligations);
        } else {
            events.extend(self.distribute(total)?);
        }

        Ok(events)
    }

    /// Pay out a roll. A resource kind whose total demand exceeds the bank
    /// is paid to nobody.
    fn distribute(&mut self, roll: u8) -> Result<Vec<GameEvent>, ActionError> {
        let owed = self.board.production_for_roll(roll);
        let mut events = Vec::new();
        let mut distributions = Vec::new();

        for resource in Resource::ALL {
            let demanded: u32 = owed.values().map(|hand| hand.get(resource)).sum();
            if demanded == 0 {
                continue;
            }
            let available = self.ledger.bank().get(resource);
            if available < demanded {
                info!(%resource, demanded, available, "bank shortage, nobody is paid");
                events.push(GameEvent::ResourceShortage {
                    resource,
                    demanded,
                    available,
                });
                continue;
            }
            for (&player, hand) in &owed {
                let amount = hand.get(resource);
                if amount > 0 {
                    self.ledger
                        .grant(player, &ResourceHand::single(resource, amount))?;
                    distributions.push((player, resource, amount));
                }
            }
        }

        if !distributions.is_empty() {
            events.insert(0, GameEvent::ResourcesDistributed { distributions });
        }
        Ok(events)
    }

    fn end_turn(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, ActionError> {
        self.turn.require_turn(player)?;
        if self.turn.phase() != Phase::AwaitingFreeAction {
            return Err(ActionError::PhaseViolation(
                "the turn cannot end before the roll is resolved",
            ));
        }

        self.players[player.index()].end_turn();
        self.open_trade = None;
        let next_player = self.turn.end_turn();
        Ok(vec![GameEvent::TurnEnded {
            player,
            next_player,
        }])
    }

    // ==================== Forced Phases ====================

    fn discard(
        &mut self,
        player: PlayerId,
        resources: ResourceHand,
    ) -> Result<Vec<GameEvent>, ActionError> {
        if self.turn.phase() != Phase::AwaitingDiscard {
            return Err(ActionError::PhaseViolation("no discards are pending"));
        }
        let owed = self.turn.pending_discard(player);
        if owed == 0 {
            return Err(ActionError::PhaseViolation("you owe no discard"));
        }
        if resources.total() != owed {
            return Err(ActionError::InvalidTarget(
                "discard must total exactly the owed amount",
            ));
        }

        self.ledger.pay(player, &resources)?;
        self.turn.discarded(player);
        Ok(vec![GameEvent::CardsDiscarded {
            player,
            count: owed,
        }])
    }

    fn move_robber(&mut self, player: PlayerId, tile: TileId) -> Result<Vec<GameEvent>, ActionError> {
        self.turn.require_turn(player)?;
        if self.turn.phase() != Phase::AwaitingRobberMove {
            return Err(ActionError::PhaseViolation("the robber is not due to move"));
        }
        self.check_robber_target(tile)?;

        let event = self.relocate_robber(player, tile);
        let candidates = self.steal_candidates(tile, player);
        self.turn.robber_moved(tile, candidates);
        Ok(vec![event])
    }

    fn robber_steal(
        &mut self,
        player: PlayerId,
        victim: PlayerId,
    ) -> Result<Vec<GameEvent>, ActionError> {
        self.turn.require_turn(player)?;
        if self.turn.phase() != Phase::AwaitingSteal {
            return Err(ActionError::PhaseViolation("nothing to steal now"));
        }
        if !self.turn.steal_candidates().contains(&victim) {
            return Err(ActionError::InvalidTarget(
                "that player cannot be robbed here",
            ));
        }

        let events = self.steal(player, victim)?.into_iter().collect();
        self.turn.stolen();
        Ok(events)
    }

    // ==================== Building ====================

    fn build_road(&mut self, player: PlayerId, edge: EdgeId) -> Result<Vec<GameEvent>, ActionError> {
        self.require_free_action(player)?;
        self.board.check_road(edge, player)?;
        if self.players[player.index()].stock.roads == 0 {
            return Err(ActionError::InsufficientStock("no roads left"));
        }

        self.ledger.pay(player, &costs::road())?;
        self.board.place_road(edge, player);
        self.players[player.index()].stock.roads -= 1;
        Ok(vec![GameEvent::RoadBuilt { player, edge }])
    }

    fn build_settlement(
        &mut self,
        player: PlayerId,
        vertex: VertexId,
    ) -> Result<Vec<GameEvent>, ActionError> {
        self.require_free_action(player)?;
        self.board.check_settlement(vertex, player, true)?;
        if self.players[player.index()].stock.settlements == 0 {
            return Err(ActionError::InsufficientStock("no settlements left"));
        }

        self.ledger.pay(player, &costs::settlement())?;
        self.board.place_settlement(vertex, player);
        let port = self.board.port_at(vertex);
        let record = &mut self.players[player.index()];
        record.stock.settlements -= 1;
        record.victory_points += 1;
        if let Some(port) = port {
            record.register_port(port);
        }
        Ok(vec![GameEvent::SettlementBuilt { player, vertex }])
    }

    fn build_city(&mut self, player: PlayerId, vertex: VertexId) -> Result<Vec<GameEvent>, ActionError> {
        self.require_free_action(player)?;
        self.board.check_city(vertex, player)?;
        if self.players[player.index()].stock.cities == 0 {
            return Err(ActionError::InsufficientStock("no cities left"));
        }

        self.ledger.pay(player, &costs::city())?;
        self.board.upgrade_to_city(vertex, player);
        let record = &mut self.players[player.index()];
        record.stock.cities -= 1;
        record.stock.settlements += 1;
        record.victory_points += 1;
        Ok(vec![GameEvent::CityBuilt { player, vertex }])
    }

    fn buy_development_card(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, ActionError> {
        self.require_free_action(player)?;
        let cost = costs::development_card();
        if !self.ledger.hand(player).can_afford(&cost) {
            return Err(ActionError::InsufficientResources(
                "a development card costs sheep, wheat and ore",
            ));
        }
        let Some(card) = self.deck.draw() else {
            return Err(ActionError::InsufficientStock(
                "the development deck is empty",
            ));
        };

        self.ledger.pay(player, &cost)?;
        let record = &mut self.players[player.index()];
        record.dev_cards.acquire(card);
        if card == DevelopmentCard::VictoryPoint {
            record.victory_points += 1;
        }
        Ok(vec![GameEvent::DevelopmentCardPurchased { player }])
    }

    // ==================== Development Cards ====================

    fn play_knight(
        &mut self,
        player: PlayerId,
        tile: TileId,
        victim: Option<PlayerId>,
    ) -> Result<Vec<GameEvent>, ActionError> {
        self.check_card_play(player, DevelopmentCard::Knight)?;
        self.check_robber_target(tile)?;
        let candidates = self.steal_candidates(tile, player);
        match victim {
            None if !candidates.is_empty() => {
                return Err(ActionError::InvalidTarget("a victim must be chosen"));
            }
            Some(_) if candidates.is_empty() => {
                return Err(ActionError::InvalidTarget(
                    "nobody at that tile can be robbed",
                ));
            }
            Some(v) if !candidates.contains(&v) => {
                return Err(ActionError::InvalidTarget(
                    "that player cannot be robbed here",
                ));
            }
            _ => {}
        }

        let mut events = vec![self.mark_card_played(player, DevelopmentCard::Knight)];
        self.players[player.index()].knights_played += 1;
        events.push(self.relocate_robber(player, tile));
        if let Some(victim) = victim {
            events.extend(self.steal(player, victim)?);
        }
        Ok(events)
    }

    fn play_road_building(
        &mut self,
        player: PlayerId,
        edges: Vec<EdgeId>,
    ) -> Result<Vec<GameEvent>, ActionError> {
        self.check_card_play(player, DevelopmentCard::RoadBuilding)?;
        if edges.is_empty() || edges.len() > 2 {
            return Err(ActionError::InvalidTarget("road building places one or two roads"));
        }
        if edges.len() == 2 && edges[0] == edges[1] {
            return Err(ActionError::InvalidTarget("the two roads must differ"));
        }
        if (self.players[player.index()].stock.roads as usize) < edges.len() {
            return Err(ActionError::InsufficientStock("not enough roads left"));
        }

        // the second road may hang off the first
        let mut preview = self.board.clone();
        for &edge in &edges {
            preview.check_road(edge, player)?;
            preview.place_road(edge, player);
        }

        let mut events = vec![self.mark_card_played(player, DevelopmentCard::RoadBuilding)];
        self.board = preview;
        self.players[player.index()].stock.roads -= edges.len() as u32;
        events.extend(
            edges
                .into_iter()
                .map(|edge| GameEvent::RoadBuilt { player, edge }),
        );
        Ok(events)
    }

    fn play_year_of_plenty(
        &mut self,
        player: PlayerId,
        resources: Vec<Resource>,
    ) -> Result<Vec<GameEvent>, ActionError> {
        self.check_card_play(player, DevelopmentCard::YearOfPlenty)?;
        if resources.is_empty() || resources.len() > 2 {
            return Err(ActionError::InvalidTarget(
                "year of plenty takes one or two resources",
            ));
        }
        let taken: ResourceHand = resources.into_iter().collect();
        if !self.ledger.bank().can_afford(&taken) {
            return Err(ActionError::BankShortage("bank cannot supply that"));
        }

        let event = self.mark_card_played(player, DevelopmentCard::YearOfPlenty);
        self.ledger.grant(player, &taken)?;
        Ok(vec![
            event,
            GameEvent::YearOfPlentyTaken {
                player,
                resources: taken,
            },
        ])
    }

    fn play_monopoly(
        &mut self,
        player: PlayerId,
        resource: Resource,
    ) -> Result<Vec<GameEvent>, ActionError> {
        self.check_card_play(player, DevelopmentCard::Monopoly)?;

        let event = self.mark_card_played(player, DevelopmentCard::Monopoly);
        let mut total = 0;
        for other in 0..self.players.len() {
            let other = PlayerId(other as u8);
            if other == player {
                continue;
            }
            let amount = self.ledger.hand(other).get(resource);
            if amount > 0 {
                self.ledger
                    .transfer(other, player, &ResourceHand::single(resource, amount))?;
                total += amount;
            }
        }
        Ok(vec![
            event,
            GameEvent::MonopolyCollected {
                player,
                resource,
                total,
            },
        ])
    }

    // ==================== Trading ====================

    fn bank_trade(
        &mut self,
        player: PlayerId,
        offer: ResourceHand,
        request: ResourceHand,
    ) -> Result<Vec<GameEvent>, ActionError> {
        self.require_free_action(player)?;
        if offer.is_empty() || request.is_empty() {
            return Err(ActionError::InvalidTarget("both sides of a trade must be nonempty"));
        }
        if offer.overlaps(&request) {
            return Err(ActionError::InvalidTarget(
                "a kind cannot be on both sides of a trade",
            ));
        }
        let record = &self.players[player.index()];
        let mut units = 0;
        for (resource, amount) in offer.iter() {
            let ratio = record.trade_ratio(resource);
            if amount % ratio != 0 {
                return Err(ActionError::InvalidTarget(
                    "offer must be a multiple of your trade ratio",
                ));
            }
            units += amount / ratio;
        }
        if request.total() != units {
            return Err(ActionError::InvalidTarget(
                "request does not match the offer at your trade ratio",
            ));
        }

        self.ledger.exchange_with_bank(player, &offer, &request)?;
        Ok(vec![GameEvent::BankTradeCompleted {
            player,
            gave: offer,
            received: request,
        }])
    }

    fn propose_trade(
        &mut self,
        player: PlayerId,
        offer: ResourceHand,
        request: ResourceHand,
    ) -> Result<Vec<GameEvent>, ActionError> {
        self.require_free_action(player)?;
        let proposal = TradeOffer {
            from: player,
            offer,
            request,
        };
        if !proposal.is_well_formed() {
            return Err(ActionError::InvalidTarget(
                "a proposal needs distinct, nonempty sides",
            ));
        }
        if !self.ledger.hand(player).can_afford(&proposal.offer) {
            return Err(ActionError::InsufficientResources(
                "you do not hold what you offer",
            ));
        }

        self.open_trade = Some(proposal.clone());
        Ok(vec![GameEvent::TradeProposed { offer: proposal }])
    }

    fn accept_trade(
        &mut self,
        player: PlayerId,
        trader: PlayerId,
        offer: ResourceHand,
        request: ResourceHand,
    ) -> Result<Vec<GameEvent>, ActionError> {
        if self.turn.phase() != Phase::AwaitingFreeAction {
            return Err(ActionError::PhaseViolation("trades are only open after the roll"));
        }
        if player == trader {
            return Err(ActionError::InvalidTarget("you cannot accept your own proposal"));
        }
        let matches = self
            .open_trade
            .as_ref()
            .is_some_and(|t| t.from == trader && t.offer == offer && t.request == request);
        if !matches {
            return Err(ActionError::InvalidTarget("no matching open proposal"));
        }

        self.ledger.swap(trader, &offer, player, &request)?;
        self.open_trade = None;
        Ok(vec![GameEvent::TradeCompleted {
            proposer: trader,
            acceptor: player,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bonus::Bonus;
    use crate::config::GameConfig;
    use crate::dev_cards::{DevelopmentDeck, DECK_SIZE};
    use crate::topology::tests::fixed_layout;
    use crate::topology::PortKind;
    use crate::turn::Outcome;
    use crate::view::PlayerView;
    use pretty_assertions::assert_eq;

    const ADA: PlayerId = PlayerId(0);
    const BO: PlayerId = PlayerId(1);

    /// Two players on the fixed board. Ada holds 14 (ore port) and 9, Bo
    /// holds 20 and 43.
    fn placed_game() -> Game {
        let names = vec!["ada".to_string(), "bo".to_string()];
        let mut game = Game::with_board(names, fixed_layout(), GameConfig::seeded(9)).unwrap();
        for (player, vertex, edge) in [(ADA, 14, 16), (BO, 20, 26), (BO, 43, 58), (ADA, 9, 11)] {
            game.apply(
                player,
                Action::PlaceInitialSettlement {
                    vertex_id: VertexId(vertex),
                },
            )
            .unwrap();
            game.apply(player, Action::PlaceInitialRoad { edge_id: EdgeId(edge) })
                .unwrap();
        }
        game
    }

    /// Ada to act after a roll of 3, which nobody collects on
    fn started_game() -> Game {
        let mut game = placed_game();
        game.roll_with(ADA, (1, 2)).unwrap();
        game
    }

    fn deal_card(game: &mut Game, player: PlayerId, card: DevelopmentCard) {
        game.deck.draw().unwrap();
        let holdings = &mut game.players[player.index()].dev_cards;
        holdings.acquire(card);
        holdings.end_turn();
    }

    fn pass_round(game: &mut Game) {
        game.apply(ADA, Action::EndTurn).unwrap();
        game.roll_with(BO, (1, 2)).unwrap();
        game.apply(BO, Action::EndTurn).unwrap();
        game.roll_with(ADA, (1, 2)).unwrap();
    }

    #[test]
    fn test_second_settlement_collects_starting_resources() {
        let game = placed_game();
        assert_eq!(game.ledger().hand(ADA), ResourceHand::with_amounts(1, 0, 1, 1, 0));
        assert_eq!(game.ledger().hand(BO), ResourceHand::with_amounts(1, 0, 0, 1, 1));
        assert_eq!(game.phase(), Phase::AwaitingRoll);
        assert_eq!(game.current_player(), ADA);
        assert_eq!(game.players()[0].victory_points, 2);
        assert_eq!(
            game.players()[0].ports,
            vec![crate::topology::PortKind::Specific(Resource::Ore)]
        );
    }

    #[test]
    fn test_initial_road_must_touch_new_settlement() {
        let names = vec!["ada".to_string(), "bo".to_string()];
        let mut game = Game::with_board(names, fixed_layout(), GameConfig::seeded(9)).unwrap();
        game.apply(
            ADA,
            Action::PlaceInitialSettlement {
                vertex_id: VertexId(14),
            },
        )
        .unwrap();
        assert!(matches!(
            game.apply(ADA, Action::PlaceInitialRoad { edge_id: EdgeId(0) }),
            Err(ActionError::OwnershipViolation(_))
        ));
        assert!(matches!(
            game.apply(BO, Action::PlaceInitialRoad { edge_id: EdgeId(16) }),
            Err(ActionError::PhaseViolation(_))
        ));
    }

    #[test]
    fn test_roll_pays_adjacent_buildings() {
        let mut game = placed_game();
        let outcome = game.roll_with(ADA, (2, 4)).unwrap();
        assert_eq!(game.ledger().hand(ADA).get(Resource::Wood), 2);
        assert_eq!(game.ledger().hand(BO).get(Resource::Wood), 2);
        assert_eq!(game.ledger().hand(BO).get(Resource::Wheat), 2);
        assert!(matches!(
            outcome.events[1],
            GameEvent::ResourcesDistributed { .. }
        ));
        assert_eq!(game.phase(), Phase::AwaitingFreeAction);
    }

    #[test]
    fn test_shortage_pays_nobody_that_kind() {
        let mut game = placed_game();
        // Ada hoards every wheat the bank had
        game.ledger
            .set_hand(ADA, ResourceHand::with_amounts(1, 0, 1, 18, 0));
        assert_eq!(game.ledger().bank().get(Resource::Wheat), 0);

        let outcome = game.roll_with(ADA, (2, 4)).unwrap();
        assert!(outcome.events.contains(&GameEvent::ResourceShortage {
            resource: Resource::Wheat,
            demanded: 1,
            available: 0,
        }));
        assert_eq!(game.ledger().hand(BO).get(Resource::Wheat), 1);
        assert_eq!(game.ledger().hand(BO).get(Resource::Wood), 2);
        assert_eq!(game.ledger().hand(ADA).get(Resource::Wood), 2);
        game.check_invariants().unwrap();
    }

    #[test]
    fn test_seven_forces_discard_robber_and_steal() {
        let mut game = placed_game();
        game.ledger
            .set_hand(ADA, ResourceHand::with_amounts(3, 2, 2, 1, 1));
        let outcome = game.roll_with(ADA, (3, 4)).unwrap();

        assert_eq!(game.phase(), Phase::AwaitingDiscard);
        let view = PlayerView::project(&game, ADA);
        assert_eq!(view.must_discard, 4);
        assert_eq!(PlayerView::project(&game, BO).must_discard, 0);
        assert!(outcome.events.contains(&GameEvent::DiscardsRequired {
            obligations: vec![(ADA, 4)],
        }));

        assert!(matches!(
            game.apply(
                ADA,
                Action::DiscardResources {
                    resources: ResourceHand::with_amounts(3, 0, 0, 0, 0),
                }
            ),
            Err(ActionError::InvalidTarget(_))
        ));
        assert!(matches!(
            game.apply(
                BO,
                Action::DiscardResources {
                    resources: ResourceHand::single(Resource::Ore, 1),
                }
            ),
            Err(ActionError::PhaseViolation(_))
        ));
        assert!(matches!(
            game.apply(ADA, Action::EndTurn),
            Err(ActionError::PhaseViolation(_))
        ));

        game.apply(
            ADA,
            Action::DiscardResources {
                resources: ResourceHand::with_amounts(3, 1, 0, 0, 0),
            },
        )
        .unwrap();
        assert_eq!(game.phase(), Phase::AwaitingRobberMove);
        assert_eq!(game.ledger().hand(ADA).total(), 5);

        assert!(matches!(
            game.apply(
                ADA,
                Action::MoveRobber {
                    target_tile: game.board().robber(),
                }
            ),
            Err(ActionError::InvalidTarget(_))
        ));
        game.apply(
            ADA,
            Action::MoveRobber {
                target_tile: TileId(4),
            },
        )
        .unwrap();
        assert_eq!(game.phase(), Phase::AwaitingSteal);
        assert_eq!(game.turn().steal_candidates(), &[BO]);

        game.apply(ADA, Action::RobberSteal { victim_id: BO }).unwrap();
        assert_eq!(game.phase(), Phase::AwaitingFreeAction);
        assert_eq!(game.ledger().hand(ADA).total(), 6);
        assert_eq!(game.ledger().hand(BO).total(), 2);
    }

    #[test]
    fn test_robber_without_victims_skips_steal() {
        let mut game = placed_game();
        game.roll_with(ADA, (3, 4)).unwrap();
        assert_eq!(game.phase(), Phase::AwaitingRobberMove);
        game.apply(
            ADA,
            Action::MoveRobber {
                target_tile: TileId(10),
            },
        )
        .unwrap();
        assert_eq!(game.phase(), Phase::AwaitingFreeAction);
    }

    #[test]
    fn test_rejected_build_changes_nothing() {
        let mut game = started_game();
        let before = game.views();
        assert!(matches!(
            game.apply(
                ADA,
                Action::PlaceCity {
                    vertex_id: VertexId(9),
                }
            ),
            Err(ActionError::InsufficientResources(_))
        ));
        assert!(matches!(
            game.apply(
                ADA,
                Action::PlaceSettlement {
                    vertex_id: VertexId(20),
                }
            ),
            Err(_)
        ));
        assert_eq!(game.views(), before);
    }

    #[test]
    fn test_city_upgrade() {
        let mut game = started_game();
        game.ledger
            .set_hand(ADA, ResourceHand::with_amounts(0, 0, 0, 2, 3));
        game.apply(
            ADA,
            Action::PlaceCity {
                vertex_id: VertexId(9),
            },
        )
        .unwrap();
        let ada = &game.players()[0];
        assert_eq!(ada.victory_points, 3);
        assert_eq!(ada.stock.cities, 3);
        assert_eq!(ada.stock.settlements, 4);
        assert!(game.ledger().hand(ADA).is_empty());

        assert!(matches!(
            game.apply(
                ADA,
                Action::PlaceCity {
                    vertex_id: VertexId(20),
                }
            ),
            Err(_)
        ));
    }

    #[test]
    fn test_longest_road_moves_two_points() {
        let mut game = started_game();
        game.ledger
            .set_hand(ADA, ResourceHand::with_amounts(4, 4, 0, 0, 0));
        let mut last = None;
        for edge in [12, 7, 1, 0] {
            last = Some(
                game.apply(ADA, Action::PlaceRoad { edge_id: EdgeId(edge) })
                    .unwrap(),
            );
        }
        let ada = &game.players()[0];
        assert_eq!(ada.longest_road_length, 5);
        assert!(ada.has_longest_road);
        assert_eq!(ada.victory_points, 4);
        assert!(last.unwrap().events.contains(&GameEvent::BonusChanged {
            bonus: Bonus::LongestRoad,
            previous: None,
            current: Some(ADA),
        }));
    }

    #[test]
    fn test_settlement_needs_own_road() {
        let mut game = started_game();
        game.ledger
            .set_hand(ADA, ResourceHand::with_amounts(3, 3, 1, 1, 0));
        assert!(matches!(
            game.apply(
                ADA,
                Action::PlaceSettlement {
                    vertex_id: VertexId(11),
                }
            ),
            Err(ActionError::OwnershipViolation(_))
        ));
        game.apply(ADA, Action::PlaceRoad { edge_id: EdgeId(12) })
            .unwrap();
        game.apply(ADA, Action::PlaceRoad { edge_id: EdgeId(13) })
            .unwrap();
        game.apply(
            ADA,
            Action::PlaceSettlement {
                vertex_id: VertexId(11),
            },
        )
        .unwrap();
        assert_eq!(game.players()[0].victory_points, 3);
    }

    #[test]
    fn test_reaching_target_wins() {
        let mut game = started_game();
        game.ledger
            .set_hand(ADA, ResourceHand::with_amounts(3, 3, 1, 1, 0));
        game.apply(ADA, Action::PlaceRoad { edge_id: EdgeId(12) })
            .unwrap();
        game.apply(ADA, Action::PlaceRoad { edge_id: EdgeId(13) })
            .unwrap();
        game.players[0].victory_points = 9;

        let outcome = game
            .apply(
                ADA,
                Action::PlaceSettlement {
                    vertex_id: VertexId(11),
                },
            )
            .unwrap();
        assert!(outcome.events.contains(&GameEvent::GameWon {
            player: ADA,
            victory_points: 10,
        }));
        assert_eq!(
            game.phase(),
            Phase::Terminal {
                outcome: Outcome::Won { winner: ADA }
            }
        );
        assert!(game.legal_actions(ADA).is_empty());
        assert!(matches!(
            game.apply(ADA, Action::EndTurn),
            Err(ActionError::PhaseViolation(_))
        ));
    }

    #[test]
    fn test_bought_card_waits_a_turn() {
        let mut game = placed_game();
        let mut cards = vec![DevelopmentCard::Monopoly];
        cards.resize(DECK_SIZE, DevelopmentCard::Knight);
        game.deck = DevelopmentDeck::from_draw_order(cards);
        game.roll_with(ADA, (1, 2)).unwrap();

        game.ledger
            .set_hand(ADA, ResourceHand::with_amounts(0, 0, 1, 1, 1));
        game.apply(ADA, Action::BuyDevelopmentCard).unwrap();
        assert_eq!(game.development_cards_remaining(), DECK_SIZE - 1);
        assert!(matches!(
            game.apply(
                ADA,
                Action::PlayMonopolyCard {
                    resource: Resource::Wheat,
                }
            ),
            Err(ActionError::InsufficientStock(_))
        ));

        pass_round(&mut game);
        let outcome = game
            .apply(
                ADA,
                Action::PlayMonopolyCard {
                    resource: Resource::Wheat,
                },
            )
            .unwrap();
        assert!(outcome.events.contains(&GameEvent::MonopolyCollected {
            player: ADA,
            resource: Resource::Wheat,
            total: 1,
        }));
        assert_eq!(game.ledger().hand(BO).get(Resource::Wheat), 0);
    }

    #[test]
    fn test_empty_deck_rejects_purchase() {
        let mut game = started_game();
        game.deck = DevelopmentDeck::from_draw_order(Vec::new());
        game.ledger
            .set_hand(ADA, ResourceHand::with_amounts(0, 0, 1, 1, 1));
        assert!(matches!(
            game.apply(ADA, Action::BuyDevelopmentCard),
            Err(ActionError::InsufficientStock(_))
        ));
        assert_eq!(game.ledger().hand(ADA).total(), 3);
    }

    #[test]
    fn test_knights_earn_largest_army() {
        let mut game = started_game();
        for _ in 0..3 {
            deal_card(&mut game, ADA, DevelopmentCard::Knight);
        }

        assert!(matches!(
            game.apply(
                ADA,
                Action::PlayKnightCard {
                    target_tile: TileId(4),
                    victim_id: None,
                }
            ),
            Err(ActionError::InvalidTarget(_))
        ));
        game.apply(
            ADA,
            Action::PlayKnightCard {
                target_tile: TileId(4),
                victim_id: Some(BO),
            },
        )
        .unwrap();
        assert_eq!(game.board().robber(), TileId(4));
        assert_eq!(game.ledger().hand(BO).total(), 2);
        assert!(matches!(
            game.apply(
                ADA,
                Action::PlayKnightCard {
                    target_tile: TileId(10),
                    victim_id: None,
                }
            ),
            Err(ActionError::PhaseViolation(_))
        ));

        pass_round(&mut game);
        game.apply(
            ADA,
            Action::PlayKnightCard {
                target_tile: TileId(10),
                victim_id: None,
            },
        )
        .unwrap();
        assert!(!game.players()[0].has_largest_army);

        pass_round(&mut game);
        let outcome = game
            .apply(
                ADA,
                Action::PlayKnightCard {
                    target_tile: TileId(13),
                    victim_id: None,
                },
            )
            .unwrap();
        let ada = &game.players()[0];
        assert_eq!(ada.knights_played, 3);
        assert!(ada.has_largest_army);
        assert_eq!(ada.victory_points, 4);
        assert!(outcome.events.contains(&GameEvent::BonusChanged {
            bonus: Bonus::LargestArmy,
            previous: None,
            current: Some(ADA),
        }));
    }

    #[test]
    fn test_road_building_chains_two_roads() {
        let mut game = started_game();
        deal_card(&mut game, ADA, DevelopmentCard::RoadBuilding);
        assert!(matches!(
            game.apply(
                ADA,
                Action::PlayRoadBuildingCard {
                    edge_ids: vec![EdgeId(13), EdgeId(12)],
                }
            ),
            Err(ActionError::OwnershipViolation(_))
        ));
        game.apply(
            ADA,
            Action::PlayRoadBuildingCard {
                edge_ids: vec![EdgeId(12), EdgeId(13)],
            },
        )
        .unwrap();
        assert_eq!(game.board().road_owner(EdgeId(13)), Some(ADA));
        assert_eq!(game.players()[0].stock.roads, 11);
        assert!(game.ledger().hand(ADA).get(Resource::Wood) == 1);
    }

    #[test]
    fn test_year_of_plenty_draws_from_bank() {
        let mut game = started_game();
        deal_card(&mut game, ADA, DevelopmentCard::YearOfPlenty);
        assert!(matches!(
            game.apply(
                ADA,
                Action::PlayYearOfPlentyCard {
                    resources: vec![Resource::Ore; 3],
                }
            ),
            Err(ActionError::InvalidTarget(_))
        ));
        game.apply(
            ADA,
            Action::PlayYearOfPlentyCard {
                resources: vec![Resource::Ore, Resource::Ore],
            },
        )
        .unwrap();
        assert_eq!(game.ledger().hand(ADA).get(Resource::Ore), 2);
        assert!(game.players()[0].played_dev_card_this_turn);
    }

    #[test]
    fn test_port_ratio_and_bank_stock() {
        let mut game = started_game();
        game.ledger
            .set_hand(ADA, ResourceHand::with_amounts(4, 0, 0, 0, 2));
        game.ledger
            .set_hand(BO, ResourceHand::single(Resource::Sheep, 19));

        let ore_for_sheep = Action::BankTrade {
            offer: ResourceHand::single(Resource::Ore, 2),
            request: ResourceHand::single(Resource::Sheep, 1),
        };
        assert!(matches!(
            game.apply(ADA, ore_for_sheep.clone()),
            Err(ActionError::BankShortage(_))
        ));

        game.ledger.set_hand(BO, ResourceHand::new());
        game.apply(ADA, ore_for_sheep).unwrap();
        assert_eq!(
            game.ledger().hand(ADA),
            ResourceHand::with_amounts(4, 0, 1, 0, 0)
        );

        // no wood port: 4 to 1
        assert!(matches!(
            game.apply(
                ADA,
                Action::BankTrade {
                    offer: ResourceHand::single(Resource::Wood, 2),
                    request: ResourceHand::single(Resource::Brick, 1),
                }
            ),
            Err(ActionError::InvalidTarget(_))
        ));
        game.apply(
            ADA,
            Action::BankTrade {
                offer: ResourceHand::single(Resource::Wood, 4),
                request: ResourceHand::single(Resource::Brick, 1),
            },
        )
        .unwrap();
        assert_eq!(game.ledger().hand(ADA).get(Resource::Brick), 1);
    }

    #[test]
    fn test_generic_port_rejects_two_for_one() {
        let mut game = started_game();
        game.players[ADA.index()].ports = vec![PortKind::Generic];
        game.ledger
            .set_hand(ADA, ResourceHand::single(Resource::Ore, 3));
        let bank = *game.ledger().bank();

        assert!(matches!(
            game.apply(
                ADA,
                Action::BankTrade {
                    offer: ResourceHand::single(Resource::Ore, 2),
                    request: ResourceHand::single(Resource::Sheep, 1),
                }
            ),
            Err(ActionError::InvalidTarget(_))
        ));
        assert_eq!(game.ledger().hand(ADA), ResourceHand::single(Resource::Ore, 3));
        assert_eq!(*game.ledger().bank(), bank);

        game.apply(
            ADA,
            Action::BankTrade {
                offer: ResourceHand::single(Resource::Ore, 3),
                request: ResourceHand::single(Resource::Sheep, 1),
            },
        )
        .unwrap();
        assert_eq!(game.ledger().hand(ADA), ResourceHand::single(Resource::Sheep, 1));
    }

    #[test]
    fn test_oversized_counts_are_rejected() {
        let huge = ResourceHand::with_amounts(u32::MAX, 5, 0, 0, 0);

        let mut game = placed_game();
        game.ledger
            .set_hand(ADA, ResourceHand::with_amounts(4, 2, 2, 1, 1));
        game.roll_with(ADA, (3, 4)).unwrap();
        assert_eq!(game.turn.pending_discard(ADA), 5);
        assert!(matches!(
            game.apply(ADA, Action::DiscardResources { resources: huge }),
            Err(ActionError::InvalidTarget(_))
        ));
        assert_eq!(game.phase(), Phase::AwaitingDiscard);
        assert_eq!(game.ledger().hand(ADA).total(), 10);

        let mut game = started_game();
        let hand = game.ledger().hand(ADA);
        let sheep = ResourceHand::single(Resource::Sheep, 1);
        for action in [
            Action::ProposeTrade {
                offer: huge,
                request: sheep,
            },
            Action::BankTrade {
                offer: huge,
                request: sheep,
            },
            Action::ProposeTrade {
                offer: sheep,
                request: huge,
            },
        ] {
            assert!(matches!(
                game.apply(ADA, action),
                Err(ActionError::InvalidTarget(_))
            ));
        }
        assert_eq!(game.ledger().hand(ADA), hand);
        assert!(game.open_trade().is_none());

        let envelope = serde_json::json!({
            "type": "discard_resources",
            "resources": {"wood": 4294967295u64, "brick": 5},
        });
        let action = Action::from_json(envelope).unwrap();
        assert!(matches!(
            action.check_counts(),
            Err(ActionError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_player_trade_needs_exact_terms() {
        let mut game = started_game();
        let offer = ResourceHand::single(Resource::Wood, 1);
        let request = ResourceHand::single(Resource::Ore, 1);
        game.apply(ADA, Action::ProposeTrade { offer, request })
            .unwrap();
        assert_eq!(game.legal_actions(BO).len(), 1);

        assert!(matches!(
            game.apply(
                BO,
                Action::AcceptTrade {
                    trader_id: ADA,
                    offer,
                    request: ResourceHand::single(Resource::Wheat, 1),
                }
            ),
            Err(ActionError::InvalidTarget(_))
        ));
        game.apply(
            BO,
            Action::AcceptTrade {
                trader_id: ADA,
                offer,
                request,
            },
        )
        .unwrap();
        assert_eq!(game.ledger().hand(ADA), ResourceHand::with_amounts(0, 0, 1, 1, 1));
        assert_eq!(game.ledger().hand(BO), ResourceHand::with_amounts(2, 0, 0, 1, 0));
        assert!(game.open_trade().is_none());
    }

    #[test]
    fn test_end_turn_passes_to_next_seat() {
        let mut game = started_game();
        let outcome = game.apply(ADA, Action::EndTurn).unwrap();
        assert_eq!(
            outcome.events,
            vec![GameEvent::TurnEnded {
                player: ADA,
                next_player: BO,
            }]
        );
        assert_eq!(game.current_player(), BO);
        assert_eq!(game.phase(), Phase::AwaitingRoll);
        assert!(matches!(
            game.apply(ADA, Action::RollDice),
            Err(ActionError::PhaseViolation(_))
        ));
    }
}
