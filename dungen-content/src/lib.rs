//! Reference [`Carver`]/[`ContentPlacer`] implementations.
//!
//! Grounded on the template's `content::mapgen` module: `UniformCarver`
//! mirrors `bigroom`'s "stamp the whole footprint as floor" approach
//! scaled up to every room in a [`Layout`], and `WeightedContentPlacer`
//! mirrors `bigroom`/`rooms_and_corridors`'s `choose_weighted` spawn
//! selection over a fixed candidate table.

use dungen_core::content::{Carver, Content, ContentPlacer, Layer, Loot, Puzzle, Secret, Spawn, TileMap};
use dungen_core::error::GenError;
use dungen_core::graph::{Archetype, Graph};
use dungen_core::layout::Layout;
use dungen_core::rng::DungeonRng;

const FLOOR: u32 = 0;
const WALL: u32 = 1;

/// Stamps every room footprint as floor and every corridor polyline as a
/// one-tile-wide floor strip onto a blank, wall-filled grid.
pub struct UniformCarver;

impl Carver for UniformCarver {
    fn carve(&self, _rng: &mut DungeonRng, graph: &Graph, layout: &Layout) -> Result<TileMap, GenError> {
        let width = (layout.bounds.max.x - layout.bounds.min.x + 1).max(1);
        let height = (layout.bounds.max.y - layout.bounds.min.y + 1).max(1);
        let mut data = vec![WALL; (width * height) as usize];

        let mut set_floor = |x: i32, y: i32| {
            if x >= 0 && y >= 0 && x < width && y < height {
                data[(y * width + x) as usize] = FLOOR;
            }
        };

        for (id, pose) in &layout.poses {
            let Some(room) = graph.rooms.get(id) else {
                continue;
            };
            let (min, max) = pose.corners(room.size.footprint_side());
            for y in min.y..=max.y {
                for x in min.x..=max.x {
                    set_floor(x, y);
                }
            }
        }

        for path in layout.paths.values() {
            for w in path.windows(2) {
                let (a, b) = (w[0], w[1]);
                if a.x == b.x {
                    let (lo, hi) = (a.y.min(b.y), a.y.max(b.y));
                    for y in lo..=hi {
                        set_floor(a.x, y);
                    }
                } else {
                    let (lo, hi) = (a.x.min(b.x), a.x.max(b.x));
                    for x in lo..=hi {
                        set_floor(x, a.y);
                    }
                }
            }
        }

        Ok(TileMap {
            width,
            height,
            layers: vec![Layer::TileLayer { width, height, data }],
        })
    }
}

/// A named spawn/loot/puzzle table entry with a relative weight, the way
/// the template's bestiary/armory entries carry a `spawn_weight`.
struct WeightedEntry {
    name: &'static str,
    weight: f64,
}

const MOB_TABLE: [WeightedEntry; 4] = [
    WeightedEntry { name: "grunt", weight: 5.0 },
    WeightedEntry { name: "archer", weight: 3.0 },
    WeightedEntry { name: "brute", weight: 1.5 },
    WeightedEntry { name: "elite", weight: 0.5 },
];

const ITEM_TABLE: [WeightedEntry; 3] = [
    WeightedEntry { name: "potion", weight: 4.0 },
    WeightedEntry { name: "scroll", weight: 2.0 },
    WeightedEntry { name: "relic", weight: 0.75 },
];

fn choose<'a>(rng: &mut DungeonRng, table: &'a [WeightedEntry]) -> &'a str {
    let total: f64 = table.iter().map(|e| e.weight).sum();
    let mut roll = rng.f64_unit() * total;
    for entry in table {
        if roll < entry.weight {
            return entry.name;
        }
        roll -= entry.weight;
    }
    table.last().map(|e| e.name).unwrap_or("grunt")
}

/// Places spawns, loot (one guaranteed per key provider), puzzles, and
/// secrets from fixed weighted tables onto non-Start, non-Boss rooms.
pub struct WeightedContentPlacer;

impl ContentPlacer for WeightedContentPlacer {
    fn place(
        &self,
        rng: &mut DungeonRng,
        graph: &Graph,
        layout: &Layout,
        _tiles: &TileMap,
    ) -> Result<Content, GenError> {
        let mut content = Content::default();

        let mut room_ids: Vec<&String> = graph.rooms.keys().collect();
        rng.shuffle(&mut room_ids);

        for id in &room_ids {
            let room = &graph.rooms[*id];
            let Some(pose) = layout.poses.get(*id) else {
                continue;
            };

            match room.archetype {
                Archetype::Start => continue,
                Archetype::Boss => {
                    content.spawns.push(Spawn {
                        id: format!("spawn-{id}"),
                        room_id: (*id).clone(),
                        x: pose.x,
                        y: pose.y,
                        kind: "elite".to_string(),
                    });
                }
                Archetype::Treasure => {
                    for cap in &room.provides {
                        content.loot.push(Loot {
                            id: format!("loot-{id}-{}", cap.value),
                            room_id: (*id).clone(),
                            item: cap.value.clone(),
                            required: true,
                        });
                    }
                    content.loot.push(Loot {
                        id: format!("loot-extra-{id}"),
                        room_id: (*id).clone(),
                        item: choose(rng, &ITEM_TABLE).to_string(),
                        required: false,
                    });
                }
                Archetype::Puzzle => {
                    content.puzzles.push(Puzzle {
                        id: format!("puzzle-{id}"),
                        room_id: (*id).clone(),
                        kind: "lever-sequence".to_string(),
                    });
                }
                Archetype::Secret => {
                    content.secrets.push(Secret {
                        id: format!("secret-{id}"),
                        room_id: (*id).clone(),
                        reveals: choose(rng, &ITEM_TABLE).to_string(),
                    });
                }
                _ => {
                    if rng.f64_unit() < 0.5 {
                        content.spawns.push(Spawn {
                            id: format!("spawn-{id}"),
                            room_id: (*id).clone(),
                            x: pose.x,
                            y: pose.y,
                            kind: choose(rng, &MOB_TABLE).to_string(),
                        });
                    }
                }
            }
        }

        Ok(content)
    }
}
