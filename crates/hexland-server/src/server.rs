//! WebSocket server and connection handling.

use crate::config::{clamp_seats, ServerConfig};
use crate::protocol::{ClientMessage, ServerMessage, SessionInfo, SessionStatus};
use crate::session::{Departure, GameSession, SessionError, SessionUpdate};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState {
    pub config: ServerConfig,
    /// All live sessions. A session is only touched while its entry is held.
    pub sessions: DashMap<Uuid, GameSession>,
    /// Mapping from connection ID to its session ID
    pub connection_sessions: DashMap<Uuid, Uuid>,
    /// Mapping from connection ID to its outbound queue
    pub senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            sessions: DashMap::new(),
            connection_sessions: DashMap::new(),
            senders: DashMap::new(),
        }
    }

    /// Queue a message for one connection.
    pub fn send_to(&self, connection: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.senders.get(&connection) {
            let _ = sender.send(msg);
        }
    }

    /// Queue the same message for several connections.
    pub fn send_to_all(&self, connections: &[Uuid], msg: ServerMessage) {
        for &connection in connections {
            self.send_to(connection, msg.clone());
        }
    }

    fn send_error(&self, connection: Uuid, err: impl ToString) {
        self.send_to(
            connection,
            ServerMessage::Error {
                message: err.to_string(),
            },
        );
    }

    /// Deliver per-seat snapshots, then the result if the game just ended.
    fn deliver(&self, update: SessionUpdate, connections: &[Uuid]) {
        for (connection, view) in update.views {
            self.send_to(connection, ServerMessage::State { view });
        }
        if let Some((winner, winner_name)) = update.winner {
            self.send_to_all(
                connections,
                ServerMessage::GameOver {
                    winner,
                    winner_name,
                },
            );
        }
    }

    /// Whether a connection sits in a lobby or running game. A seat in a
    /// finished game is released here.
    fn in_live_session(&self, connection: Uuid) -> bool {
        let Some(game_id) = self.connection_sessions.get(&connection).map(|g| *g) else {
            return false;
        };
        let mut empty = false;
        if let Some(mut session) = self.sessions.get_mut(&game_id) {
            if session.status != SessionStatus::Finished {
                return true;
            }
            if let Some(seat) = session.seats.get_mut(&connection) {
                seat.connected = false;
            }
            empty = session.connections().is_empty();
        }
        self.connection_sessions.remove(&connection);
        if empty {
            debug!(session = %game_id, "finished session released");
            self.sessions.remove(&game_id);
        }
        false
    }

    /// Lobbies that can still be joined.
    pub fn waiting_sessions(&self) -> Vec<SessionInfo> {
        self.sessions
            .iter()
            .filter(|s| s.status == SessionStatus::Waiting)
            .map(|s| s.to_info())
            .collect()
    }
}

/// Run the WebSocket server.
pub async fn run_server(state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(state.config.addr).await?;
    info!("Hexland server listening on {}", state.config.addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let connection = Uuid::new_v4();

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.senders.insert(connection, tx);

    let welcome = serde_json::to_string(&ServerMessage::Welcome {
        connection_id: connection,
    })?;
    ws_sender.send(Message::Text(welcome)).await?;

    // Writer task: the only place this socket is written after the welcome
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(e) => error!("Failed to encode outbound message: {}", e),
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(connection, client_msg, &state),
                Err(e) => {
                    warn!("Malformed frame from {}: {}", connection, e);
                    state.send_error(connection, "malformed message");
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", connection);
                break;
            }
            Ok(Message::Ping(_)) => state.send_to(connection, ServerMessage::Pong),
            Err(e) => {
                error!("WebSocket error from {}: {}", connection, e);
                break;
            }
            _ => {}
        }
    }

    handle_disconnect(connection, &state);
    state.senders.remove(&connection);
    send_task.abort();

    info!("Connection closed for {}", connection);
    Ok(())
}

/// Handle a client message.
fn handle_message(connection: Uuid, msg: ClientMessage, state: &Arc<ServerState>) {
    match msg {
        ClientMessage::CreateGame {
            player_name,
            max_players,
        } => {
            if state.in_live_session(connection) {
                state.send_error(connection, "already in a game");
                return;
            }
            let game_id = Uuid::new_v4();
            let max_players = clamp_seats(max_players.unwrap_or(state.config.max_players));
            let session = GameSession::new(
                game_id,
                connection,
                player_name,
                max_players,
                state.config.game_config(),
            );
            let info = session.to_info();

            state.sessions.insert(game_id, session);
            state.connection_sessions.insert(connection, game_id);
            info!(session = %game_id, host = %connection, "game created");

            state.send_to(connection, ServerMessage::GameCreated { game_id });
            state.send_to(connection, ServerMessage::Joined { session: info });
        }

        ClientMessage::JoinGame {
            game_id,
            player_name,
        } => {
            if state.in_live_session(connection) {
                state.send_error(connection, "already in a game");
                return;
            }
            let Some(mut session) = state.sessions.get_mut(&game_id) else {
                state.send_error(connection, "Game not found");
                return;
            };
            match session.add_player(connection, player_name) {
                Ok(()) => {
                    let info = session.to_info();
                    let others: Vec<Uuid> = session
                        .connections()
                        .into_iter()
                        .filter(|&c| c != connection)
                        .collect();
                    drop(session);

                    state.connection_sessions.insert(connection, game_id);
                    state.send_to(
                        connection,
                        ServerMessage::Joined {
                            session: info.clone(),
                        },
                    );
                    state.send_to_all(&others, ServerMessage::LobbyUpdated { session: info });
                }
                Err(e) => state.send_error(connection, e),
            }
        }

        ClientMessage::LeaveGame => {
            let Some(game_id) = state.connection_sessions.get(&connection).map(|g| *g) else {
                state.send_error(connection, SessionError::PlayerNotInSession);
                return;
            };
            let Some(mut session) = state.sessions.get_mut(&game_id) else {
                return;
            };
            match session.remove_player(connection) {
                Ok(empty) => {
                    let info = session.to_info();
                    let others = session.connections();
                    drop(session);

                    state.connection_sessions.remove(&connection);
                    if empty {
                        state.sessions.remove(&game_id);
                    } else {
                        state.send_to_all(&others, ServerMessage::LobbyUpdated { session: info });
                    }
                    state.send_to(connection, ServerMessage::Left);
                }
                Err(e) => state.send_error(connection, e),
            }
        }

        ClientMessage::StartGame => {
            let Some(game_id) = state.connection_sessions.get(&connection).map(|g| *g) else {
                state.send_error(connection, SessionError::PlayerNotInSession);
                return;
            };
            let Some(mut session) = state.sessions.get_mut(&game_id) else {
                return;
            };
            match session.start_game(connection) {
                Ok(update) => {
                    drop(session);
                    for (seat_connection, view) in update.views {
                        state.send_to(
                            seat_connection,
                            ServerMessage::GameStarted {
                                seat: view.viewer,
                                view,
                            },
                        );
                    }
                }
                Err(e) => state.send_error(connection, e),
            }
        }

        ClientMessage::Action { action } => {
            let Some(game_id) = state.connection_sessions.get(&connection).map(|g| *g) else {
                state.send_error(connection, SessionError::PlayerNotInSession);
                return;
            };
            let Some(mut session) = state.sessions.get_mut(&game_id) else {
                return;
            };
            let result = session.apply_action(connection, action);
            let connections = session.connections();
            drop(session);

            match result {
                Ok(update) => {
                    debug!(session = %game_id, %connection, "action accepted");
                    state.deliver(update, &connections);
                }
                Err(SessionError::Rejected(e)) if e.is_fatal() => {
                    error!(session = %game_id, "session aborted: {}", e);
                    state.send_to_all(
                        &connections,
                        ServerMessage::SessionAborted {
                            reason: e.reason().to_string(),
                        },
                    );
                }
                Err(SessionError::Rejected(e)) => state.send_to(
                    connection,
                    ServerMessage::ActionRejected {
                        kind: e.kind().to_string(),
                        reason: e.reason().to_string(),
                    },
                ),
                Err(e) => state.send_error(connection, e),
            }
        }

        ClientMessage::ListGames => {
            let games = state.waiting_sessions();
            state.send_to(connection, ServerMessage::GameList { games });
        }

        ClientMessage::Ping => state.send_to(connection, ServerMessage::Pong),
    }
}

/// Handle a dropped connection.
fn handle_disconnect(connection: Uuid, state: &Arc<ServerState>) {
    let Some((_, game_id)) = state.connection_sessions.remove(&connection) else {
        return;
    };
    let Some(mut session) = state.sessions.get_mut(&game_id) else {
        return;
    };

    let departure = session.depart(connection);
    let info = session.to_info();
    let others = session.connections();
    let name = match departure {
        Ok(Departure::Disconnected { player, .. }) => session.player_name(player),
        _ => None,
    };
    let abandoned = others.is_empty() && session.status != SessionStatus::Waiting;
    drop(session);

    if abandoned {
        info!(session = %game_id, "last connection left, dropping session");
        state.sessions.remove(&game_id);
    }

    match departure {
        Ok(Departure::Removed { empty: true }) => {
            state.sessions.remove(&game_id);
        }
        Ok(Departure::Removed { empty: false }) => {
            state.send_to_all(&others, ServerMessage::LobbyUpdated { session: info });
        }
        Ok(Departure::Disconnected { player, aborted }) => {
            state.send_to_all(
                &others,
                ServerMessage::PlayerDisconnected {
                    seat: player,
                    name: name.unwrap_or_default(),
                },
            );
            if aborted {
                state.send_to_all(
                    &others,
                    ServerMessage::SessionAborted {
                        reason: "too few players remain".to_string(),
                    },
                );
            }
        }
        Ok(Departure::Ignored) => {}
        Err(e) => warn!("Disconnect of {} from {}: {}", connection, game_id, e),
    }
}
