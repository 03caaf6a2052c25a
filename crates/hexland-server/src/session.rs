//! Game session management.

use hexland_core::{Action, ActionError, Game, GameConfig, PlayerId, PlayerView, SetupError};
use std::collections::HashMap;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::clamp_seats;
use crate::protocol::{SeatInfo, SessionInfo, SessionStatus};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Game is full")]
    SessionFull,

    #[error("Player not in game")]
    PlayerNotInSession,

    #[error("Not the host")]
    NotHost,

    #[error("Game already started")]
    AlreadyStarted,

    #[error("Not enough players")]
    NotEnoughPlayers,

    #[error("Game not started")]
    NotStarted,

    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Rejected(#[from] ActionError),
}

/// A connection holding a seat.
#[derive(Debug, Clone)]
pub struct Seat {
    pub connection: Uuid,
    pub name: String,
    pub connected: bool,
    /// Player id in the game, assigned when the game starts
    pub player: Option<PlayerId>,
}

impl Seat {
    pub fn new(connection: Uuid, name: String) -> Self {
        Self {
            connection,
            name,
            connected: true,
            player: None,
        }
    }

    pub fn to_info(&self) -> SeatInfo {
        SeatInfo {
            id: self.connection,
            name: self.name.clone(),
            seat: self.player,
            connected: self.connected,
        }
    }
}

/// Snapshots to deliver after the game changed, one per seated connection
#[derive(Debug, Clone)]
pub struct SessionUpdate {
    pub views: Vec<(Uuid, PlayerView)>,
    pub winner: Option<(PlayerId, String)>,
}

/// What a departing connection did to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    /// Left a lobby; `empty` when nobody is left
    Removed { empty: bool },
    /// Dropped mid-game; `aborted` when too few seats stay connected
    Disconnected { player: PlayerId, aborted: bool },
    /// The game was already over
    Ignored,
}

/// A lobby and, once started, the game it runs.
pub struct GameSession {
    pub id: Uuid,
    pub name: String,
    pub max_players: u8,
    pub host_id: Uuid,
    pub status: SessionStatus,
    pub seats: HashMap<Uuid, Seat>,
    /// Join order, which becomes seat order
    pub seat_order: Vec<Uuid>,
    pub config: GameConfig,
    pub game: Option<Game>,
}

impl GameSession {
    pub fn new(
        id: Uuid,
        host_id: Uuid,
        host_name: String,
        max_players: u8,
        config: GameConfig,
    ) -> Self {
        let mut seats = HashMap::new();
        seats.insert(host_id, Seat::new(host_id, host_name.clone()));

        Self {
            id,
            name: format!("{}'s Game", host_name),
            max_players: clamp_seats(max_players),
            host_id,
            status: SessionStatus::Waiting,
            seats,
            seat_order: vec![host_id],
            config,
            game: None,
        }
    }

    pub fn player_count(&self) -> usize {
        self.seats.len()
    }

    pub fn is_full(&self) -> bool {
        self.seats.len() >= self.max_players as usize
    }

    pub fn add_player(&mut self, connection: Uuid, name: String) -> Result<(), SessionError> {
        if self.status != SessionStatus::Waiting {
            return Err(SessionError::AlreadyStarted);
        }
        if self.is_full() {
            return Err(SessionError::SessionFull);
        }

        self.seats.insert(connection, Seat::new(connection, name));
        self.seat_order.push(connection);
        Ok(())
    }

    /// Leave a waiting lobby. Returns true if it is now empty.
    pub fn remove_player(&mut self, connection: Uuid) -> Result<bool, SessionError> {
        if self.status != SessionStatus::Waiting {
            return Err(SessionError::AlreadyStarted);
        }
        if self.seats.remove(&connection).is_none() {
            return Err(SessionError::PlayerNotInSession);
        }
        self.seat_order.retain(|&id| id != connection);

        if connection == self.host_id {
            if let Some(&next) = self.seat_order.first() {
                self.host_id = next;
            }
        }

        Ok(self.seats.is_empty())
    }

    /// Handle a dropped connection in any state
    pub fn depart(&mut self, connection: Uuid) -> Result<Departure, SessionError> {
        match self.status {
            SessionStatus::Waiting => {
                let empty = self.remove_player(connection)?;
                Ok(Departure::Removed { empty })
            }
            SessionStatus::Finished => {
                if let Some(seat) = self.seats.get_mut(&connection) {
                    seat.connected = false;
                }
                Ok(Departure::Ignored)
            }
            SessionStatus::InGame => {
                let seat = self
                    .seats
                    .get_mut(&connection)
                    .ok_or(SessionError::PlayerNotInSession)?;
                seat.connected = false;
                let player = seat.player.ok_or(SessionError::PlayerNotInSession)?;

                let connected = self.seats.values().filter(|s| s.connected).count();
                let aborted = connected < 2;
                if aborted {
                    if let Some(game) = self.game.as_mut() {
                        game.abandon();
                    }
                    self.status = SessionStatus::Finished;
                    info!(session = %self.id, "too few players left, game abandoned");
                }
                Ok(Departure::Disconnected { player, aborted })
            }
        }
    }

    pub fn start_game(&mut self, requester: Uuid) -> Result<SessionUpdate, SessionError> {
        if requester != self.host_id {
            return Err(SessionError::NotHost);
        }
        if self.status != SessionStatus::Waiting {
            return Err(SessionError::AlreadyStarted);
        }
        if self.seats.len() < 2 {
            return Err(SessionError::NotEnoughPlayers);
        }

        let names: Vec<String> = self
            .seat_order
            .iter()
            .filter_map(|id| self.seats.get(id).map(|s| s.name.clone()))
            .collect();
        let game = Game::with_players(names, self.config.clone())?;

        for (index, connection) in self.seat_order.iter().enumerate() {
            if let Some(seat) = self.seats.get_mut(connection) {
                seat.player = Some(PlayerId(index as u8));
            }
        }
        self.game = Some(game);
        self.status = SessionStatus::InGame;
        info!(session = %self.id, players = self.seats.len(), "game started");

        Ok(self.update())
    }

    /// Parse and apply an action envelope from `connection`
    pub fn apply_action(
        &mut self,
        connection: Uuid,
        envelope: serde_json::Value,
    ) -> Result<SessionUpdate, SessionError> {
        let player = self
            .seats
            .get(&connection)
            .ok_or(SessionError::PlayerNotInSession)?
            .player
            .ok_or(SessionError::NotStarted)?;
        let game = self.game.as_mut().ok_or(SessionError::NotStarted)?;

        let action = Action::from_json(envelope)?;
        let result = game.apply(player, action);
        if game.is_finished() {
            self.status = SessionStatus::Finished;
        }
        result?;

        Ok(self.update())
    }

    /// One snapshot per seated connection, plus the winner if there is one
    pub fn update(&self) -> SessionUpdate {
        let Some(game) = self.game.as_ref() else {
            return SessionUpdate {
                views: Vec::new(),
                winner: None,
            };
        };

        let views = self
            .seats
            .values()
            .filter_map(|seat| {
                let player = seat.player?;
                Some((seat.connection, PlayerView::project(game, player)))
            })
            .collect();

        let winner = game.winner().and_then(|id| {
            let connection = self.seat_order.get(id.index())?;
            let name = self.seats.get(connection)?.name.clone();
            Some((id, name))
        });

        SessionUpdate { views, winner }
    }

    /// Connections still attached to this session
    pub fn connections(&self) -> Vec<Uuid> {
        self.seats
            .values()
            .filter(|s| s.connected)
            .map(|s| s.connection)
            .collect()
    }

    pub fn player_name(&self, player: PlayerId) -> Option<String> {
        let connection = self.seat_order.get(player.index())?;
        self.seats.get(connection).map(|s| s.name.clone())
    }

    pub fn to_info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            name: self.name.clone(),
            players: self
                .seat_order
                .iter()
                .filter_map(|id| self.seats.get(id).map(|s| s.to_info()))
                .collect(),
            max_players: self.max_players,
            host_id: self.host_id,
            status: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexland_core::Phase;
    use serde_json::json;

    fn lobby(max_players: u8) -> (GameSession, Uuid) {
        let host = Uuid::new_v4();
        let session = GameSession::new(
            Uuid::new_v4(),
            host,
            "Host".to_string(),
            max_players,
            GameConfig::seeded(17),
        );
        (session, host)
    }

    fn started() -> (GameSession, Uuid, Uuid) {
        let (mut session, host) = lobby(4);
        let guest = Uuid::new_v4();
        session.add_player(guest, "Guest".to_string()).unwrap();
        session.start_game(host).unwrap();
        (session, host, guest)
    }

    #[test]
    fn test_create_session() {
        let (session, host) = lobby(4);
        assert_eq!(session.player_count(), 1);
        assert!(!session.is_full());
        assert_eq!(session.host_id, host);
        assert_eq!(session.status, SessionStatus::Waiting);
        assert_eq!(lobby(9).0.max_players, 4);
    }

    #[test]
    fn test_add_remove_players() {
        let (mut session, host) = lobby(2);
        let guest = Uuid::new_v4();
        session.add_player(guest, "Guest".to_string()).unwrap();
        assert!(session.is_full());
        assert!(matches!(
            session.add_player(Uuid::new_v4(), "Late".to_string()),
            Err(SessionError::SessionFull)
        ));

        assert!(!session.remove_player(host).unwrap());
        assert_eq!(session.host_id, guest);
        assert!(session.remove_player(guest).unwrap());
    }

    #[test]
    fn test_start_game_assigns_seats() {
        let (mut session, host) = lobby(4);
        assert!(matches!(
            session.start_game(host),
            Err(SessionError::NotEnoughPlayers)
        ));

        let guest = Uuid::new_v4();
        session.add_player(guest, "Guest".to_string()).unwrap();
        assert!(matches!(session.start_game(guest), Err(SessionError::NotHost)));

        let update = session.start_game(host).unwrap();
        assert_eq!(session.status, SessionStatus::InGame);
        assert_eq!(update.views.len(), 2);
        assert_eq!(session.seats[&host].player, Some(PlayerId(0)));
        assert_eq!(session.seats[&guest].player, Some(PlayerId(1)));
        for (connection, view) in &update.views {
            assert_eq!(session.seats[connection].player, Some(view.viewer));
        }
    }

    #[test]
    fn test_rejected_action_reports_kind() {
        let (mut session, _host, guest) = started();
        let err = session
            .apply_action(guest, json!({ "type": "roll_dice" }))
            .unwrap_err();
        match err {
            SessionError::Rejected(e) => assert_eq!(e.kind(), "phase_violation"),
            other => panic!("unexpected {other}"),
        }

        let err = session
            .apply_action(guest, json!({ "type": "teleport" }))
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Rejected(ActionError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_accepted_action_refreshes_every_seat() {
        let (mut session, host, _guest) = started();
        let game = session.game.as_ref().unwrap();
        let action = game.legal_actions(PlayerId(0)).remove(0);
        let envelope = serde_json::to_value(&action).unwrap();

        let update = session.apply_action(host, envelope).unwrap();
        assert_eq!(update.views.len(), 2);
        assert!(update.winner.is_none());
        assert!(matches!(
            session.game.as_ref().unwrap().phase(),
            Phase::InitialPlacement { .. }
        ));
    }

    #[test]
    fn test_disconnect_aborts_two_player_game() {
        let (mut session, host, guest) = started();
        let departure = session.depart(guest).unwrap();
        assert_eq!(
            departure,
            Departure::Disconnected {
                player: PlayerId(1),
                aborted: true,
            }
        );
        assert_eq!(session.status, SessionStatus::Finished);
        assert!(session.game.as_ref().unwrap().is_finished());
        assert_eq!(session.connections(), vec![host]);
        assert_eq!(session.depart(host).unwrap(), Departure::Ignored);
        assert!(session.connections().is_empty());
    }

    #[test]
    fn test_disconnect_keeps_three_player_game() {
        let (mut session, host) = lobby(4);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        session.add_player(a, "A".to_string()).unwrap();
        session.add_player(b, "B".to_string()).unwrap();
        session.start_game(host).unwrap();

        let departure = session.depart(b).unwrap();
        assert_eq!(
            departure,
            Departure::Disconnected {
                player: PlayerId(2),
                aborted: false,
            }
        );
        assert_eq!(session.status, SessionStatus::InGame);
        assert_eq!(session.player_name(PlayerId(2)).as_deref(), Some("B"));
    }

    #[test]
    fn test_lobby_departure_removes_seat() {
        let (mut session, host) = lobby(3);
        assert_eq!(
            session.depart(host).unwrap(),
            Departure::Removed { empty: true }
        );
    }
}
