//! Mutable per-game overlay on the board graph: buildings, roads and the
//! robber.

use crate::error::ActionError;
use crate::player::PlayerId;
use crate::resources::ResourceHand;
use crate::topology::{BoardTopology, EdgeId, PortKind, TileId, VertexId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// What's built on a vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexBuilding {
    #[default]
    Empty,
    /// 1 VP, 1 resource per adjacent tile
    Settlement(PlayerId),
    /// 2 VP, 2 resources per adjacent tile
    City(PlayerId),
}

impl VertexBuilding {
    pub fn owner(&self) -> Option<PlayerId> {
        match self {
            VertexBuilding::Empty => None,
            VertexBuilding::Settlement(p) | VertexBuilding::City(p) => Some(*p),
        }
    }

    /// How many resources per production
    pub fn resource_multiplier(&self) -> u32 {
        match self {
            VertexBuilding::Empty => 0,
            VertexBuilding::Settlement(_) => 1,
            VertexBuilding::City(_) => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    topology: BoardTopology,
    robber: TileId,
    vertices: Vec<VertexBuilding>,
    roads: Vec<Option<PlayerId>>,
}

impl Board {
    /// Empty board with the robber on the desert
    pub fn new(topology: BoardTopology) -> Self {
        let robber = topology.desert();
        let vertices = vec![VertexBuilding::Empty; topology.vertices.len()];
        let roads = vec![None; topology.edges.len()];
        Self {
            topology,
            robber,
            vertices,
            roads,
        }
    }

    pub fn topology(&self) -> &BoardTopology {
        &self.topology
    }

    pub fn robber(&self) -> TileId {
        self.robber
    }

    pub fn building(&self, vertex: VertexId) -> VertexBuilding {
        self.vertices
            .get(vertex.index())
            .copied()
            .unwrap_or_default()
    }

    pub fn road_owner(&self, edge: EdgeId) -> Option<PlayerId> {
        self.roads.get(edge.index()).copied().flatten()
    }

    pub fn port_at(&self, vertex: VertexId) -> Option<PortKind> {
        self.topology.vertex(vertex).and_then(|v| v.port)
    }

    /// Edges owned by a player
    pub fn roads_of(&self, player: PlayerId) -> impl Iterator<Item = EdgeId> + '_ {
        self.roads
            .iter()
            .enumerate()
            .filter(move |(_, owner)| **owner == Some(player))
            .map(|(index, _)| EdgeId(index as u8))
    }

    // ==================== Validation Methods ====================

    /// A vertex is free under the distance rule if it and all its
    /// neighbors are empty
    pub fn satisfies_distance_rule(&self, vertex: VertexId) -> bool {
        match self.topology.vertex(vertex) {
            Some(node) => node
                .neighbors
                .iter()
                .all(|n| self.building(*n) == VertexBuilding::Empty),
            None => false,
        }
    }

    /// Check if a vertex is touched by one of the player's roads
    pub fn is_connected_to_road(&self, vertex: VertexId, player: PlayerId) -> bool {
        self.topology
            .vertex(vertex)
            .is_some_and(|node| node.edges.iter().any(|e| self.road_owner(*e) == Some(player)))
    }

    /// Check if an edge touches the player's building or road
    pub fn touches_network(&self, edge: EdgeId, player: PlayerId) -> bool {
        let Some(node) = self.topology.edge(edge) else {
            return false;
        };
        node.vertices
            .iter()
            .any(|v| self.building(*v).owner() == Some(player))
            || node
                .neighbors
                .iter()
                .any(|e| self.road_owner(*e) == Some(player))
    }

    /// Why a settlement at `vertex` would be illegal. Initial placement
    /// skips the road connection.
    pub fn check_settlement(
        &self,
        vertex: VertexId,
        player: PlayerId,
        needs_road: bool,
    ) -> Result<(), ActionError> {
        if self.topology.vertex(vertex).is_none() {
            return Err(ActionError::InvalidTarget("no such vertex"));
        }
        if self.building(vertex) != VertexBuilding::Empty {
            return Err(ActionError::OwnershipViolation("vertex already built on"));
        }
        if !self.satisfies_distance_rule(vertex) {
            return Err(ActionError::DistanceRuleViolation(
                "a neighboring vertex holds a building",
            ));
        }
        if needs_road && !self.is_connected_to_road(vertex, player) {
            return Err(ActionError::OwnershipViolation(
                "vertex is not reached by your roads",
            ));
        }
        Ok(())
    }

    pub fn check_road(&self, edge: EdgeId, player: PlayerId) -> Result<(), ActionError> {
        if self.topology.edge(edge).is_none() {
            return Err(ActionError::InvalidTarget("no such edge"));
        }
        if self.road_owner(edge).is_some() {
            return Err(ActionError::OwnershipViolation("edge already has a road"));
        }
        if !self.touches_network(edge, player) {
            return Err(ActionError::OwnershipViolation(
                "edge does not touch your buildings or roads",
            ));
        }
        Ok(())
    }

    pub fn check_city(&self, vertex: VertexId, player: PlayerId) -> Result<(), ActionError> {
        if self.topology.vertex(vertex).is_none() {
            return Err(ActionError::InvalidTarget("no such vertex"));
        }
        if self.building(vertex) != VertexBuilding::Settlement(player) {
            return Err(ActionError::OwnershipViolation(
                "vertex does not hold your settlement",
            ));
        }
        Ok(())
    }

    /// Get valid settlement spots for a player
    pub fn valid_settlement_spots(&self, player: PlayerId, is_setup: bool) -> Vec<VertexId> {
        self.topology
            .vertices
            .iter()
            .map(|v| v.id)
            .filter(|v| self.check_settlement(*v, player, !is_setup).is_ok())
            .collect()
    }

    pub fn valid_road_spots(&self, player: PlayerId) -> Vec<EdgeId> {
        self.topology
            .edges
            .iter()
            .map(|e| e.id)
            .filter(|e| self.check_road(*e, player).is_ok())
            .collect()
    }

    pub fn valid_city_spots(&self, player: PlayerId) -> Vec<VertexId> {
        self.topology
            .vertices
            .iter()
            .map(|v| v.id)
            .filter(|v| self.building(*v) == VertexBuilding::Settlement(player))
            .collect()
    }

    /// First pair of neighboring vertices that both hold a building
    pub fn distance_rule_breach(&self) -> Option<(VertexId, VertexId)> {
        self.topology.edges.iter().find_map(|edge| {
            let [a, b] = edge.vertices;
            (self.building(a) != VertexBuilding::Empty && self.building(b) != VertexBuilding::Empty)
                .then_some((a, b))
        })
    }

    // ==================== Mutation Methods ====================

    /// Place a settlement (assumes validation already done)
    pub fn place_settlement(&mut self, vertex: VertexId, player: PlayerId) {
        if let Some(slot) = self.vertices.get_mut(vertex.index()) {
            *slot = VertexBuilding::Settlement(player);
        }
    }

    pub fn upgrade_to_city(&mut self, vertex: VertexId, player: PlayerId) {
        if let Some(slot) = self.vertices.get_mut(vertex.index()) {
            *slot = VertexBuilding::City(player);
        }
    }

    pub fn place_road(&mut self, edge: EdgeId, player: PlayerId) {
        if let Some(slot) = self.roads.get_mut(edge.index()) {
            *slot = Some(player);
        }
    }

    pub fn move_robber(&mut self, tile: TileId) {
        self.robber = tile;
    }

    // ==================== Resource Distribution ====================

    /// What each player is owed for a dice roll, before bank stock is
    /// considered. The robber's tile produces nothing.
    pub fn production_for_roll(&self, roll: u8) -> BTreeMap<PlayerId, ResourceHand> {
        let mut owed: BTreeMap<PlayerId, ResourceHand> = BTreeMap::new();

        for tile in &self.topology.tiles {
            if tile.token != Some(roll) || tile.id == self.robber {
                continue;
            }
            let Some(resource) = tile.terrain.resource() else {
                continue;
            };
            for vertex in &tile.vertices {
                let building = self.building(*vertex);
                if let Some(owner) = building.owner() {
                    owed.entry(owner)
                        .or_default()
                        .add(resource, building.resource_multiplier());
                }
            }
        }

        owed
    }

    /// One card per adjacent producing tile, granted for the second initial
    /// settlement
    pub fn starting_resources(&self, vertex: VertexId) -> ResourceHand {
        self.topology
            .vertex(vertex)
            .map(|node| {
                node.tiles
                    .iter()
                    .filter_map(|t| self.topology.tiles[t.index()].terrain.resource())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Players with a building on one of the tile's corners
    pub fn players_adjacent_to_tile(&self, tile: TileId) -> BTreeSet<PlayerId> {
        self.topology
            .tile(tile)
            .map(|node| {
                node.vertices
                    .iter()
                    .filter_map(|v| self.building(*v).owner())
                    .collect()
            })
            .unwrap_or_default()
    }
}
