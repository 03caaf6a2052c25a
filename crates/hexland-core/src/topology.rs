//! Fixed board graph: 19 tiles, 54 vertices and 72 edges.
//!
//! Every element lives in a flat arena addressed by a dense index newtype.
//! The two source tables below (vertex to tiles, edge to vertices) are the
//! whole geometry; every other adjacency list is derived from them once when
//! a topology is built. A topology also carries the randomized parts of the
//! layout (terrain, number tokens, ports) and is never mutated afterwards.

use crate::error::LayoutError;
use crate::resources::Resource;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TILE_COUNT: usize = 19;
pub const VERTEX_COUNT: usize = 54;
pub const EDGE_COUNT: usize = 72;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u8);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

arena_id!(
    /// Tile index, 0..19
    TileId
);
arena_id!(
    /// Vertex index, 0..54
    VertexId
);
arena_id!(
    /// Edge index, 0..72
    EdgeId
);

/// Tiles touching each vertex (1 to 3).
const VERTEX_TILES: [&[u8]; VERTEX_COUNT] = [
    &[0], &[0], &[0, 1], &[1], &[1, 2], &[2], &[2], &[3], &[0, 3], &[0, 3, 4], &[0, 1, 4],
    &[1, 4, 5], &[1, 2, 5], &[2, 5, 6], &[2, 6], &[6], &[7], &[3, 7], &[3, 7, 8], &[3, 4, 8],
    &[4, 8, 9], &[4, 5, 9], &[5, 9, 10], &[5, 6, 10], &[6, 10, 11], &[6, 11], &[11], &[7],
    &[7, 12], &[7, 8, 12], &[8, 12, 13], &[8, 9, 13], &[9, 13, 14], &[9, 10, 14],
    &[10, 14, 15], &[10, 11, 15], &[11, 15], &[11], &[12], &[12, 16], &[12, 13, 16],
    &[13, 16, 17], &[13, 14, 17], &[14, 17, 18], &[14, 15, 18], &[15, 18], &[15], &[16], &[16],
    &[16, 17], &[17], &[17, 18], &[18], &[18],
];

/// Endpoints of each edge.
const EDGE_VERTICES: [(u8, u8); EDGE_COUNT] = [
    (0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 6), (0, 8), (2, 10), (4, 12), (6, 14), (7, 8),
    (8, 9), (9, 10), (10, 11), (11, 12), (12, 13), (13, 14), (14, 15), (7, 17), (9, 19),
    (11, 21), (13, 23), (15, 25), (16, 17), (17, 18), (18, 19), (19, 20), (20, 21), (21, 22),
    (22, 23), (23, 24), (24, 25), (25, 26), (16, 27), (18, 29), (20, 31), (22, 33), (24, 35),
    (26, 37), (27, 28), (28, 29), (29, 30), (30, 31), (31, 32), (32, 33), (33, 34), (34, 35),
    (35, 36), (36, 37), (28, 38), (30, 40), (32, 42), (34, 44), (36, 46), (38, 39), (39, 40),
    (40, 41), (41, 42), (42, 43), (43, 44), (44, 45), (45, 46), (39, 47), (41, 49), (43, 51),
    (45, 53), (47, 48), (48, 49), (49, 50), (50, 51), (51, 52), (52, 53),
];

/// The coastal vertices in ring order. Consecutive entries (wrapping) are
/// joined by a coastal edge.
pub const COASTAL_RING: [u8; 30] = [
    0, 8, 7, 17, 16, 27, 28, 38, 39, 47, 48, 49, 50, 51, 52, 53, 45, 46, 36, 37, 26, 25, 15, 14,
    6, 5, 4, 3, 2, 1,
];

/// Ring positions of the nine port slots. A slot at position `p` covers
/// `COASTAL_RING[p]` and `COASTAL_RING[p + 1]`.
const PORT_POSITIONS: [usize; 9] = [0, 3, 7, 10, 13, 17, 20, 23, 27];

const PORT_KINDS: [PortKind; 9] = [
    PortKind::Generic,
    PortKind::Specific(Resource::Wood),
    PortKind::Generic,
    PortKind::Specific(Resource::Brick),
    PortKind::Specific(Resource::Sheep),
    PortKind::Generic,
    PortKind::Specific(Resource::Wheat),
    PortKind::Specific(Resource::Ore),
    PortKind::Generic,
];

/// Terrain tiles before shuffling: 4 wood, 3 brick, 4 sheep, 4 wheat, 3 ore, 1 desert.
pub const STANDARD_TERRAIN: [Terrain; TILE_COUNT] = [
    Terrain::Wood,
    Terrain::Wood,
    Terrain::Wood,
    Terrain::Wood,
    Terrain::Brick,
    Terrain::Brick,
    Terrain::Brick,
    Terrain::Sheep,
    Terrain::Sheep,
    Terrain::Sheep,
    Terrain::Sheep,
    Terrain::Wheat,
    Terrain::Wheat,
    Terrain::Wheat,
    Terrain::Wheat,
    Terrain::Ore,
    Terrain::Ore,
    Terrain::Ore,
    Terrain::Desert,
];

/// Number tokens for the 18 producing tiles
pub const STANDARD_TOKENS: [u8; 18] = [2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12];

/// What a tile produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Wood,
    Brick,
    Sheep,
    Wheat,
    Ore,
    Desert,
}

impl Terrain {
    /// The resource this terrain produces, if any
    pub fn resource(&self) -> Option<Resource> {
        match self {
            Terrain::Wood => Some(Resource::Wood),
            Terrain::Brick => Some(Resource::Brick),
            Terrain::Sheep => Some(Resource::Sheep),
            Terrain::Wheat => Some(Resource::Wheat),
            Terrain::Ore => Some(Resource::Ore),
            Terrain::Desert => None,
        }
    }

    pub fn is_productive(&self) -> bool {
        self.resource().is_some()
    }
}

/// Port types for maritime trading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    /// 3:1 trade any resource
    Generic,
    /// 2:1 trade for a specific resource
    Specific(Resource),
}

impl PortKind {
    /// Cards given per card received
    pub fn ratio(&self) -> u32 {
        match self {
            PortKind::Generic => 3,
            PortKind::Specific(_) => 2,
        }
    }
}

/// Which of the two mirror-image port arrangements a board uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortLayout {
    Standard,
    Mirrored,
}

impl PortLayout {
    /// Port kind and its two vertices for every slot
    pub fn slots(self) -> impl Iterator<Item = (PortKind, [VertexId; 2])> {
        PORT_POSITIONS
            .into_iter()
            .zip(PORT_KINDS)
            .map(move |(position, kind)| {
                let position = match self {
                    PortLayout::Standard => position,
                    PortLayout::Mirrored => (COASTAL_RING.len() - position) % COASTAL_RING.len(),
                };
                let next = (position + 1) % COASTAL_RING.len();
                (
                    kind,
                    [VertexId(COASTAL_RING[position]), VertexId(COASTAL_RING[next])],
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileNode {
    pub id: TileId,
    pub terrain: Terrain,
    /// Dice number, `None` only for the desert
    pub token: Option<u8>,
    pub vertices: Vec<VertexId>,
    pub edges: Vec<EdgeId>,
    /// Tiles sharing at least one vertex with this one
    pub neighbors: Vec<TileId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexNode {
    pub id: VertexId,
    pub tiles: Vec<TileId>,
    pub edges: Vec<EdgeId>,
    pub neighbors: Vec<VertexId>,
    pub port: Option<PortKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeNode {
    pub id: EdgeId,
    pub vertices: [VertexId; 2],
    pub tiles: Vec<TileId>,
    /// Edges sharing an endpoint with this one
    pub neighbors: Vec<EdgeId>,
}

impl EdgeNode {
    /// The endpoint opposite `vertex`
    pub fn other_end(&self, vertex: VertexId) -> VertexId {
        if self.vertices[0] == vertex {
            self.vertices[1]
        } else {
            self.vertices[0]
        }
    }
}

/// The read-only board graph plus its randomized layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardTopology {
    pub tiles: Vec<TileNode>,
    pub vertices: Vec<VertexNode>,
    pub edges: Vec<EdgeNode>,
    pub port_layout: PortLayout,
}

impl BoardTopology {
    /// Build a random layout.
    ///
    /// Terrain is a uniform permutation. Token permutations are redrawn until
    /// no two tiles carrying a 6 or 8 touch, and the port arrangement is a
    /// coin flip between the two mirror images.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let neighbors = tile_neighbors(&tile_vertices());

        let mut terrain = STANDARD_TERRAIN;
        terrain.shuffle(rng);

        let mut pool = STANDARD_TOKENS;
        let mut attempts = 0u32;
        let tokens = loop {
            attempts += 1;
            pool.shuffle(rng);
            let tokens = deal_tokens(&terrain, &pool);
            if hot_pair(&tokens, &neighbors).is_none() {
                break tokens;
            }
        };
        tracing::debug!(attempts, "number tokens placed");

        let port_layout = if rng.gen_bool(0.5) {
            PortLayout::Standard
        } else {
            PortLayout::Mirrored
        };

        Self::assemble(&terrain, &tokens, port_layout)
    }

    /// Validate and build an explicit layout.
    pub fn from_layout(
        terrain: &[Terrain],
        tokens: &[Option<u8>],
        port_layout: PortLayout,
    ) -> Result<Self, LayoutError> {
        if terrain.len() != TILE_COUNT || tokens.len() != TILE_COUNT {
            return Err(LayoutError::WrongTileCount {
                terrain: terrain.len(),
                tokens: tokens.len(),
            });
        }

        let mut expected_terrain = STANDARD_TERRAIN.to_vec();
        let mut given_terrain = terrain.to_vec();
        expected_terrain.sort_by_key(|t| *t as u8);
        given_terrain.sort_by_key(|t| *t as u8);
        if expected_terrain != given_terrain {
            return Err(LayoutError::TerrainMix);
        }

        for (index, (kind, token)) in terrain.iter().zip(tokens).enumerate() {
            match (kind, token) {
                (Terrain::Desert, Some(_)) => {
                    return Err(LayoutError::DesertToken(TileId(index as u8)))
                }
                (Terrain::Desert, None) => {}
                (_, None) => return Err(LayoutError::MissingToken(TileId(index as u8))),
                (_, Some(_)) => {}
            }
        }

        let mut given_tokens: Vec<u8> = tokens.iter().flatten().copied().collect();
        given_tokens.sort_unstable();
        if given_tokens != STANDARD_TOKENS {
            return Err(LayoutError::TokenMix);
        }

        let neighbors = tile_neighbors(&tile_vertices());
        if let Some((a, b)) = hot_pair(tokens, &neighbors) {
            return Err(LayoutError::AdjacentHotTiles(a, b));
        }

        Ok(Self::assemble(terrain, tokens, port_layout))
    }

    /// Derive every adjacency list from the two source tables.
    fn assemble(terrain: &[Terrain], tokens: &[Option<u8>], port_layout: PortLayout) -> Self {
        let tile_vertices = tile_vertices();
        let tile_neighbors = tile_neighbors(&tile_vertices);

        let mut vertex_edges: Vec<Vec<EdgeId>> = vec![Vec::new(); VERTEX_COUNT];
        let mut vertex_neighbors: Vec<Vec<VertexId>> = vec![Vec::new(); VERTEX_COUNT];
        for (index, &(a, b)) in EDGE_VERTICES.iter().enumerate() {
            let edge = EdgeId(index as u8);
            vertex_edges[a as usize].push(edge);
            vertex_edges[b as usize].push(edge);
            vertex_neighbors[a as usize].push(VertexId(b));
            vertex_neighbors[b as usize].push(VertexId(a));
        }

        let mut ports: Vec<Option<PortKind>> = vec![None; VERTEX_COUNT];
        for (kind, pair) in port_layout.slots() {
            for vertex in pair {
                ports[vertex.index()] = Some(kind);
            }
        }

        let vertices: Vec<VertexNode> = (0..VERTEX_COUNT)
            .map(|index| VertexNode {
                id: VertexId(index as u8),
                tiles: VERTEX_TILES[index].iter().map(|&t| TileId(t)).collect(),
                edges: vertex_edges[index].clone(),
                neighbors: vertex_neighbors[index].clone(),
                port: ports[index],
            })
            .collect();

        let edges: Vec<EdgeNode> = EDGE_VERTICES
            .iter()
            .enumerate()
            .map(|(index, &(a, b))| {
                let (a, b) = (VertexId(a), VertexId(b));
                let tiles = vertices[a.index()]
                    .tiles
                    .iter()
                    .filter(|t| vertices[b.index()].tiles.contains(t))
                    .copied()
                    .collect();
                let neighbors = [a, b]
                    .iter()
                    .flat_map(|v| vertex_edges[v.index()].iter())
                    .filter(|&&e| e.index() != index)
                    .copied()
                    .collect();
                EdgeNode {
                    id: EdgeId(index as u8),
                    vertices: [a, b],
                    tiles,
                    neighbors,
                }
            })
            .collect();

        let tiles = (0..TILE_COUNT)
            .map(|index| {
                let tile = TileId(index as u8);
                let vertices = tile_vertices[index].clone();
                let edges = edges
                    .iter()
                    .filter(|e| e.tiles.contains(&tile))
                    .map(|e| e.id)
                    .collect();
                TileNode {
                    id: tile,
                    terrain: terrain[index],
                    token: tokens[index],
                    vertices,
                    edges,
                    neighbors: tile_neighbors[index].clone(),
                }
            })
            .collect();

        Self {
            tiles,
            vertices,
            edges,
            port_layout,
        }
    }

    pub fn tile(&self, id: TileId) -> Option<&TileNode> {
        self.tiles.get(id.index())
    }

    pub fn vertex(&self, id: VertexId) -> Option<&VertexNode> {
        self.vertices.get(id.index())
    }

    pub fn edge(&self, id: EdgeId) -> Option<&EdgeNode> {
        self.edges.get(id.index())
    }

    /// The single desert tile
    pub fn desert(&self) -> TileId {
        self.tiles
            .iter()
            .find(|t| t.terrain == Terrain::Desert)
            .map(|t| t.id)
            .unwrap_or(TileId(0))
    }

    /// The edge joining two vertices, if they are neighbors
    pub fn edge_between(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        self.vertex(a)?
            .edges
            .iter()
            .copied()
            .find(|&e| self.edges[e.index()].vertices.contains(&b))
    }
}

fn tile_vertices() -> Vec<Vec<VertexId>> {
    let mut lists = vec![Vec::new(); TILE_COUNT];
    for (vertex, tiles) in VERTEX_TILES.iter().enumerate() {
        for &tile in tiles.iter() {
            lists[tile as usize].push(VertexId(vertex as u8));
        }
    }
    lists
}

fn tile_neighbors(tile_vertices: &[Vec<VertexId>]) -> Vec<Vec<TileId>> {
    (0..TILE_COUNT)
        .map(|a| {
            (0..TILE_COUNT)
                .filter(|&b| {
                    a != b && tile_vertices[a].iter().any(|v| tile_vertices[b].contains(v))
                })
                .map(|b| TileId(b as u8))
                .collect()
        })
        .collect()
}

/// Hand the shuffled tokens to the producing tiles in index order.
fn deal_tokens(terrain: &[Terrain], pool: &[u8]) -> Vec<Option<u8>> {
    let mut pool = pool.iter().copied();
    terrain
        .iter()
        .map(|t| if t.is_productive() { pool.next() } else { None })
        .collect()
}

/// First pair of touching tiles that both carry a 6 or 8
fn hot_pair(tokens: &[Option<u8>], neighbors: &[Vec<TileId>]) -> Option<(TileId, TileId)> {
    let hot = |t: usize| matches!(tokens[t], Some(6) | Some(8));
    (0..TILE_COUNT).filter(|&t| hot(t)).find_map(|t| {
        neighbors[t]
            .iter()
            .find(|n| hot(n.index()))
            .map(|&n| (TileId(t as u8), n))
    })
}
