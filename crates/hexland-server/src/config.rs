//! Server configuration from the environment.

use anyhow::Context;
use hexland_core::{GameConfig, MAX_PLAYERS, MIN_PLAYERS};
use std::net::SocketAddr;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Seat limit for lobbies that do not ask for one
    pub max_players: u8,
    /// Forwarded into every game when set
    pub game_seed: Option<u64>,
}

impl ServerConfig {
    /// Read `SERVER_ADDR`, `MAX_PLAYERS` and `GAME_SEED`
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr = lookup("SERVER_ADDR")
            .unwrap_or_else(|| DEFAULT_ADDR.into())
            .parse()
            .context("SERVER_ADDR is not a socket address")?;

        let max_players = match lookup("MAX_PLAYERS") {
            Some(raw) => raw
                .parse::<u8>()
                .context("MAX_PLAYERS is not a number")?,
            None => MAX_PLAYERS as u8,
        };

        let game_seed = lookup("GAME_SEED")
            .map(|raw| raw.parse::<u64>())
            .transpose()
            .context("GAME_SEED is not an integer")?;

        Ok(Self {
            addr,
            max_players: clamp_seats(max_players),
            game_seed,
        })
    }

    pub fn game_config(&self) -> GameConfig {
        GameConfig {
            seed: self.game_seed,
            ..GameConfig::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: ([0, 0, 0, 0], 8080).into(),
            max_players: MAX_PLAYERS as u8,
            game_seed: None,
        }
    }
}

/// Clamp a requested seat count into the playable range
pub fn clamp_seats(requested: u8) -> u8 {
    requested.clamp(MIN_PLAYERS as u8, MAX_PLAYERS as u8)
}
