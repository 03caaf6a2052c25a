//! Hexland - a rules engine for a hex-tile settlement game
//!
//! This crate holds everything the game needs except networking:
//! - Fixed 19-tile topology with randomized terrain, tokens and ports
//! - Board overlay of buildings, roads and the robber
//! - Resource ledger with bank-supply conservation
//! - Turn state machine with the forced discard / robber / steal phases
//! - Action validation and application, with per-player views
//!
//! # Architecture
//!
//! [`Game`] is a plain value owned by whoever hosts it. Every change goes
//! through [`Game::apply`], which either applies an [`Action`] completely and
//! returns the resulting [`GameEvent`]s plus fresh [`PlayerView`]s, or rejects
//! it with an [`ActionError`] and leaves the game untouched.
//!
//! # Modules
//!
//! - [`topology`]: Static board graph and layout generation
//! - [`board`]: Buildings, roads, robber and placement rules
//! - [`ledger`]: Bank and player hands
//! - [`turn`]: Phases and turn order
//! - [`game`]: The aggregate and its invariant checks
//! - [`legal`]: Enumerating acceptable actions
//! - [`view`]: Per-player snapshots

pub mod actions;
pub mod army;
pub mod board;
pub mod bonus;
pub mod config;
pub mod dev_cards;
pub mod error;
pub mod game;
pub mod ledger;
pub mod legal;
pub mod player;
mod processor;
pub mod resources;
pub mod road_network;
pub mod topology;
pub mod turn;
pub mod view;

// Re-export commonly used types
pub use actions::{Action, GameEvent, TradeOffer};
pub use board::{Board, VertexBuilding};
pub use bonus::Bonus;
pub use config::GameConfig;
pub use dev_cards::{DevCardHoldings, DevelopmentCard, DevelopmentDeck};
pub use error::{ActionError, LayoutError, SetupError};
pub use game::{ActionOutcome, Game, MAX_PLAYERS, MIN_PLAYERS};
pub use ledger::ResourceLedger;
pub use player::{PieceStock, Player, PlayerId};
pub use resources::{Resource, ResourceHand};
pub use topology::{BoardTopology, EdgeId, PortKind, PortLayout, Terrain, TileId, VertexId};
pub use turn::{ForcedAction, Outcome, Phase, PlacementStep};
pub use view::{PlayerRecordView, PlayerView};
