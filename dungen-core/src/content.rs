//! Tile carving and content placement data model (`spec.md` §4.6, §3
//! supplement).
//!
//! `dungen-core` owns the data types and the `Carver`/`ContentPlacer` trait
//! contracts; concrete implementations live downstream in `dungen-content`
//! so that crate can depend one-way on this one instead of the reverse.
//! Grounded on the template's `content::mapgen::MapGenerator` trait, which
//! is likewise a thin `Fn(&mut dyn RngCore, &Lot) -> Result<Patch>` seam
//! blanket-implemented for closures.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::GenError;
use crate::graph::Graph;
use crate::layout::Layout;
use crate::rng::DungeonRng;

/// A single layer of a [`TileMap`]. Mirrors the Tiled-style "tilelayer /
/// objectgroup" split so a generated map can carry both a row-major tile
/// grid and loosely placed point objects in the same structure.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Layer {
    TileLayer {
        width: i32,
        height: i32,
        /// Row-major tile ids, `width * height` long.
        data: Vec<u32>,
    },
    ObjectGroup { objects: Vec<TileObject> },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileObject {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub kind: String,
}

/// The carved tile representation of a [`Layout`] (`spec.md` §4.6: carving
/// is out of scope for the core pipeline's guarantees but the shape of the
/// artifact is part of the data model).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileMap {
    pub width: i32,
    pub height: i32,
    pub layers: Vec<Layer>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Spawn {
    pub id: String,
    pub room_id: String,
    pub x: i32,
    pub y: i32,
    pub kind: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Loot {
    pub id: String,
    pub room_id: String,
    pub item: String,
    pub required: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Puzzle {
    pub id: String,
    pub room_id: String,
    pub kind: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Secret {
    pub id: String,
    pub room_id: String,
    pub reveals: String,
}

/// Everything placed into a carved dungeon beyond the tile grid itself.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Content {
    pub spawns: Vec<Spawn>,
    pub loot: Vec<Loot>,
    pub puzzles: Vec<Puzzle>,
    pub secrets: Vec<Secret>,
    pub tags: IndexMap<String, String>,
}

/// Turns a validated [`Graph`]/[`Layout`] pair into a tile grid. A carver
/// owns the mapping from room footprints and corridor polylines to actual
/// tile ids; the orchestrator only needs the trait surface.
pub trait Carver {
    fn carve(&self, rng: &mut DungeonRng, graph: &Graph, layout: &Layout) -> Result<TileMap, GenError>;
}

/// Populates a carved [`TileMap`] with spawns, loot, puzzles and secrets.
pub trait ContentPlacer {
    fn place(
        &self,
        rng: &mut DungeonRng,
        graph: &Graph,
        layout: &Layout,
        tiles: &TileMap,
    ) -> Result<Content, GenError>;
}
