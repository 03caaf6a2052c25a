//! The game aggregate.
//!
//! [`Game`] owns everything a session mutates: board overlay, ledger, deck,
//! players, turn controller and the seeded random source. The only way to
//! change it is [`Game::apply`] (or [`Game::roll_with`]), which either
//! applies an action completely or rejects it with no effect.

use crate::actions::{Action, GameEvent, TradeOffer};
use crate::army::largest_army_holder;
use crate::board::Board;
use crate::bonus::{Bonus, BONUS_POINTS};
use crate::config::GameConfig;
use crate::dev_cards::{DevelopmentDeck, DECK_SIZE};
use crate::error::{ActionError, SetupError};
use crate::ledger::ResourceLedger;
use crate::player::{Player, PlayerId};
use crate::road_network::{longest_road_holder, road_lengths};
use crate::topology::BoardTopology;
use crate::turn::{Outcome, Phase, TurnController};
use crate::view::PlayerView;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, error, info};

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 4;

/// Result of an accepted action: what happened, and a fresh snapshot for
/// every player
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub events: Vec<GameEvent>,
    pub views: Vec<PlayerView>,
}

#[derive(Debug, Clone)]
pub struct Game {
    pub(crate) config: GameConfig,
    pub(crate) board: Board,
    pub(crate) ledger: ResourceLedger,
    pub(crate) deck: DevelopmentDeck,
    pub(crate) players: Vec<Player>,
    pub(crate) turn: TurnController,
    pub(crate) open_trade: Option<TradeOffer>,
    pub(crate) rng: StdRng,
}

impl Game {
    /// Game with default player names and a random board
    pub fn new(player_count: usize, config: GameConfig) -> Result<Self, SetupError> {
        let names = (1..=player_count).map(|i| format!("Player {i}")).collect();
        Self::with_players(names, config)
    }

    /// Game with named players (seat order = id order) and a random board
    pub fn with_players(names: Vec<String>, config: GameConfig) -> Result<Self, SetupError> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let topology = BoardTopology::generate(&mut rng);
        Self::assemble(names, topology, config, rng)
    }

    /// Game on an explicit board
    pub fn with_board(
        names: Vec<String>,
        topology: BoardTopology,
        config: GameConfig,
    ) -> Result<Self, SetupError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::assemble(names, topology, config, rng)
    }

    fn assemble(
        names: Vec<String>,
        topology: BoardTopology,
        config: GameConfig,
        mut rng: StdRng,
    ) -> Result<Self, SetupError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&names.len()) {
            return Err(SetupError::PlayerCount(names.len()));
        }
        let player_count = names.len();
        let players = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Player::new(PlayerId(i as u8), name))
            .collect();
        let deck = DevelopmentDeck::shuffled(&mut rng);

        info!(
            players = player_count,
            ports = ?topology.port_layout,
            "game created"
        );

        Ok(Self {
            config,
            board: Board::new(topology),
            ledger: ResourceLedger::new(player_count),
            deck,
            players,
            turn: TurnController::new(player_count as u8),
            open_trade: None,
            rng,
        })
    }

    // ==================== Queries ====================

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id.index())
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn turn(&self) -> &TurnController {
        &self.turn
    }

    pub fn phase(&self) -> Phase {
        self.turn.phase()
    }

    pub fn current_player(&self) -> PlayerId {
        self.turn.current_player()
    }

    pub fn open_trade(&self) -> Option<&TradeOffer> {
        self.open_trade.as_ref()
    }

    pub fn development_cards_remaining(&self) -> usize {
        self.deck.remaining()
    }

    pub fn is_finished(&self) -> bool {
        self.turn.phase().is_terminal()
    }

    pub fn winner(&self) -> Option<PlayerId> {
        match self.turn.phase() {
            Phase::Terminal {
                outcome: Outcome::Won { winner },
            } => Some(winner),
            _ => None,
        }
    }

    /// One snapshot per player, in id order
    pub fn views(&self) -> Vec<PlayerView> {
        self.players
            .iter()
            .map(|p| PlayerView::project(self, p.id))
            .collect()
    }

    // ==================== Actions ====================

    /// Validate and apply one action
    pub fn apply(&mut self, player: PlayerId, action: Action) -> Result<ActionOutcome, ActionError> {
        self.apply_with_dice(player, action, None)
    }

    /// Resolve a roll with the given dice instead of drawing them
    pub fn roll_with(
        &mut self,
        player: PlayerId,
        dice: (u8, u8),
    ) -> Result<ActionOutcome, ActionError> {
        if !(1..=6).contains(&dice.0) || !(1..=6).contains(&dice.1) {
            return Err(ActionError::InvalidTarget("dice must show 1 to 6"));
        }
        self.apply_with_dice(player, Action::RollDice, Some(dice))
    }

    fn apply_with_dice(
        &mut self,
        player: PlayerId,
        action: Action,
        dice: Option<(u8, u8)>,
    ) -> Result<ActionOutcome, ActionError> {
        if self.is_finished() {
            return Err(ActionError::PhaseViolation("the game is over"));
        }
        if player.index() >= self.players.len() {
            return Err(ActionError::InvalidTarget("unknown player"));
        }

        action.check_counts()?;

        let name = action.name();
        let mut events = self.process(player, action, dice)?;
        events.extend(self.refresh_bonuses());
        events.extend(self.check_win_condition(player));

        if let Err(breach) = self.check_invariants() {
            error!(%breach, action = name, "game invariant violated, aborting");
            self.turn.finish(Outcome::Aborted);
            return Err(ActionError::InvariantViolation(breach));
        }

        debug!(%player, action = name, events = events.len(), "action applied");
        Ok(ActionOutcome {
            events,
            views: self.views(),
        })
    }

    /// End the game without a winner, e.g. when too few players remain
    pub fn abandon(&mut self) -> Vec<PlayerView> {
        if !self.is_finished() {
            info!("game abandoned");
            self.turn.finish(Outcome::Aborted);
        }
        self.views()
    }

    // ==================== Bookkeeping ====================

    /// Recompute both bonuses and move the two points with them
    fn refresh_bonuses(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();

        let lengths = road_lengths(&self.board, self.players.len());
        for (player, &length) in self.players.iter_mut().zip(&lengths) {
            player.longest_road_length = length;
        }
        let road_holder = longest_road_holder(&lengths, &self.players);
        events.extend(self.transfer_bonus(Bonus::LongestRoad, road_holder));

        let army_holder = largest_army_holder(&self.players);
        events.extend(self.transfer_bonus(Bonus::LargestArmy, army_holder));

        events
    }

    fn transfer_bonus(&mut self, bonus: Bonus, holder: Option<PlayerId>) -> Option<GameEvent> {
        let previous = self.players.iter().find(|p| p.holds(bonus)).map(|p| p.id);
        if previous == holder {
            return None;
        }

        for player in &mut self.players {
            let now = Some(player.id) == holder;
            if player.holds(bonus) && !now {
                player.victory_points -= BONUS_POINTS;
            } else if now && !player.holds(bonus) {
                player.victory_points += BONUS_POINTS;
            }
            player.set_holds(bonus, now);
        }

        info!(?bonus, ?previous, current = ?holder, "bonus changed hands");
        Some(GameEvent::BonusChanged {
            bonus,
            previous,
            current: holder,
        })
    }

    /// First player at the target, scanning from the actor in seat order
    fn check_win_condition(&mut self, actor: PlayerId) -> Option<GameEvent> {
        let count = self.players.len();
        let winner = (0..count)
            .map(|offset| &self.players[(actor.index() + offset) % count])
            .find(|p| p.victory_points >= self.config.victory_points_to_win)
            .map(|p| (p.id, p.victory_points))?;

        info!(winner = %winner.0, victory_points = winner.1, "game won");
        self.turn.finish(Outcome::Won { winner: winner.0 });
        Some(GameEvent::GameWon {
            player: winner.0,
            victory_points: winner.1,
        })
    }

    /// Supply conservation, deck integrity and the distance rule
    pub fn check_invariants(&self) -> Result<(), String> {
        self.ledger.check_conservation()?;

        let drawn: u32 = self.players.iter().map(|p| p.dev_cards.total_drawn()).sum();
        if self.deck.remaining() + drawn as usize != DECK_SIZE {
            return Err(format!(
                "deck holds {} and players drew {drawn}, expected {DECK_SIZE}",
                self.deck.remaining()
            ));
        }

        if let Some((a, b)) = self.board.distance_rule_breach() {
            return Err(format!("neighboring vertices {a} and {b} both hold buildings"));
        }
        Ok(())
    }
}
