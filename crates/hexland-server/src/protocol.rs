//! WebSocket protocol messages for Hexland sessions.

use hexland_core::{PlayerId, PlayerView};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a new lobby with the sender as host
    CreateGame {
        player_name: String,
        #[serde(default)]
        max_players: Option<u8>,
    },

    /// Take a seat in a waiting lobby
    JoinGame { game_id: Uuid, player_name: String },

    /// Leave a lobby before it starts
    LeaveGame,

    /// Start the game (host only)
    StartGame,

    /// Submit a game action envelope
    Action { action: serde_json::Value },

    /// Request the list of waiting lobbies
    ListGames,

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection accepted
    Welcome { connection_id: Uuid },

    /// Lobby created
    GameCreated { game_id: Uuid },

    /// Seated in a lobby
    Joined { session: SessionInfo },

    /// Left the lobby
    Left,

    /// Someone joined or left the lobby
    LobbyUpdated { session: SessionInfo },

    /// The game began; `seat` is the receiver's player id
    GameStarted { seat: PlayerId, view: PlayerView },

    /// Fresh snapshot after an accepted action
    State { view: PlayerView },

    /// Sent only to the submitter of a rejected action
    ActionRejected { kind: String, reason: String },

    /// Someone reached the victory-point target
    GameOver { winner: PlayerId, winner_name: String },

    /// The game ended without a winner
    SessionAborted { reason: String },

    /// A seated player dropped mid-game
    PlayerDisconnected { seat: PlayerId, name: String },

    /// Lobby-level failure
    Error { message: String },

    /// Pong response
    Pong,

    /// Waiting lobbies
    GameList { games: Vec<SessionInfo> },
}

/// Lobby information for clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub name: String,
    pub players: Vec<SeatInfo>,
    pub max_players: u8,
    pub host_id: Uuid,
    pub status: SessionStatus,
}

/// One seat in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatInfo {
    pub id: Uuid,
    pub name: String,
    /// Player id in the game, assigned at start
    pub seat: Option<PlayerId>,
    pub connected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Waiting,
    InGame,
    Finished,
}
