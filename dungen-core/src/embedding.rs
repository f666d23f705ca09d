//! Force-directed spatial embedding (`spec.md` §4.4).
//!
//! Grounded on the general shape of the template's procedural generators
//! (`content::mapgen`, which samples positions from `RNG_emb`-equivalent
//! sources and shuffles candidate lists with `rng.shuffle` before
//! committing to a placement) rather than on any single template function,
//! since the template has no existing 2D force-directed layout code.

use glam::{IVec2, Vec2};
use indexmap::IndexMap;

use crate::error::{GenError, Stage};
use crate::graph::Graph;
use crate::layout::{Bounds, Path, Pose, Rotation};
use crate::rng::DungeonRng;

#[derive(Copy, Clone, Debug)]
pub struct EmbedderConfig {
    pub spring_constant: f64,
    pub repulsion_constant: f64,
    pub min_room_spacing: f64,
    pub corridor_max_bends: u32,
    pub max_iterations: u32,
    pub initial_spread: f64,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        EmbedderConfig {
            spring_constant: 0.08,
            repulsion_constant: 400.0,
            min_room_spacing: 2.0,
            corridor_max_bends: 2,
            max_iterations: 300,
            initial_spread: 200.0,
        }
    }
}

/// `corridorMaxLength = clamp(sqrt(N) * 59, 100, 600)` (`spec.md` §4.4 step 3).
pub fn adaptive_corridor_max_length(room_count: usize) -> f64 {
    ((room_count as f64).sqrt() * 59.0).clamp(100.0, 600.0)
}

/// Scale `springConstant`/`repulsionConstant` for large graphs so they stay
/// compact (`spec.md` §4.4 step 3).
fn adaptive_forces(room_count: usize, cfg: &EmbedderConfig) -> (f64, f64) {
    if room_count <= 25 {
        return (cfg.spring_constant, cfg.repulsion_constant);
    }
    let over = (room_count - 25) as f64;
    let spring = cfg.spring_constant * (1.0 + over / 10.0).min(10.0);
    let repulsion = cfg.repulsion_constant * (1.0 / (1.0 + over / 50.0)).max(0.2);
    (spring, repulsion)
}

pub fn embed(rng: &mut DungeonRng, graph: &Graph, cfg: &EmbedderConfig) -> Result<crate::layout::Layout, GenError> {
    let n = graph.rooms.len();
    if n == 0 {
        return Ok(crate::layout::Layout {
            poses: IndexMap::default(),
            paths: IndexMap::default(),
            bounds: Bounds {
                min: IVec2::ZERO,
                max: IVec2::ZERO,
            },
        });
    }

    let corridor_max_length = adaptive_corridor_max_length(n);
    let (spring_constant, repulsion_constant) = adaptive_forces(n, cfg);

    // Stable order for every RNG-observable or iteration-order-sensitive
    // loop (`spec.md` §9).
    let mut ids: Vec<String> = graph.rooms.keys().cloned().collect();
    ids.sort();

    let mut pos: IndexMap<String, Vec2> = IndexMap::default();
    for id in &ids {
        let x = (rng.f64_unit() - 0.5) * cfg.initial_spread;
        let y = (rng.f64_unit() - 0.5) * cfg.initial_spread;
        pos.insert(id.clone(), Vec2::new(x as f32, y as f32));
    }

    let sides: IndexMap<String, f32> = ids
        .iter()
        .map(|id| (id.clone(), graph.rooms[id].size.footprint_side() as f32))
        .collect();

    let edges: Vec<(String, String, f32)> = graph
        .connectors
        .values()
        .map(|c| {
            let rest = (sides[&c.from] + sides[&c.to]) / 2.0 + cfg.min_room_spacing as f32 * 4.0;
            (c.from.clone(), c.to.clone(), rest)
        })
        .collect();

    const EPSILON: f32 = 0.05;
    for _ in 0..cfg.max_iterations {
        let mut forces: IndexMap<String, Vec2> = ids.iter().map(|id| (id.clone(), Vec2::ZERO)).collect();

        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let a = &ids[i];
                let b = &ids[j];
                let delta = pos[a] - pos[b];
                let dist = delta.length().max(0.5);
                let dir = delta / dist;
                let force = dir * (repulsion_constant as f32) / (dist * dist);
                *forces.get_mut(a).unwrap() += force;
                *forces.get_mut(b).unwrap() -= force;
            }
        }

        for (from, to, rest) in &edges {
            let delta = pos[to] - pos[from];
            let dist = delta.length().max(0.01);
            let dir = delta / dist;
            let force = dir * (spring_constant as f32) * (dist - rest);
            *forces.get_mut(from).unwrap() += force;
            *forces.get_mut(to).unwrap() -= force;
        }

        let mut max_displacement = 0.0f32;
        const DAMPING: f32 = 0.85;
        for id in &ids {
            let step = forces[id] * DAMPING;
            *pos.get_mut(id).unwrap() += step;
            max_displacement = max_displacement.max(step.length());
        }

        if max_displacement < EPSILON {
            break;
        }
    }

    resolve_overlaps(&mut pos, &sides, cfg.min_room_spacing as f32);

    let mut poses: IndexMap<String, Pose> = IndexMap::default();
    for id in &ids {
        let p = pos[id];
        poses.insert(
            id.clone(),
            Pose {
                x: p.x.round() as i32,
                y: p.y.round() as i32,
                rotation: Rotation::R0,
                footprint_id: format!("square_{}", sides[id] as i32),
            },
        );
    }

    let mut paths: IndexMap<String, Path> = IndexMap::default();
    for (cid, c) in &graph.connectors {
        let path = route_corridor(
            &poses[&c.from],
            &poses[&c.to],
            cfg.corridor_max_bends,
            corridor_max_length,
        )
        .ok_or_else(|| GenError::NoValidPath(cid.clone()).in_stage(Stage::Embedding))?;
        paths.insert(cid.clone(), path);
    }

    let bounds = normalise(&mut poses, &mut paths, &sides);

    Ok(crate::layout::Layout { poses, paths, bounds })
}

/// Route a corridor as an axis-aligned polyline with at most one bend
/// (straight if the rooms already share a row/column). Fails if the
/// resulting length exceeds `corridor_max_length`.
fn route_corridor(a: &Pose, b: &Pose, max_bends: u32, corridor_max_length: f64) -> Option<Path> {
    let start = IVec2::new(a.x, a.y);
    let end = IVec2::new(b.x, b.y);

    let path: Path = if start.x == end.x || start.y == end.y || max_bends == 0 {
        vec![start, end]
    } else {
        let bend = IVec2::new(end.x, start.y);
        vec![start, bend, end]
    };

    let length = crate::layout::path_length(&path);
    if length <= corridor_max_length {
        Some(path)
    } else {
        None
    }
}

fn resolve_overlaps(pos: &mut IndexMap<String, Vec2>, sides: &IndexMap<String, f32>, spacing: f32) {
    let ids: Vec<String> = pos.keys().cloned().collect();
    for _ in 0..64 {
        let mut moved = false;
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let a = &ids[i];
                let b = &ids[j];
                // Extra margin of 1 tile absorbs centre-coordinate rounding
                // to integers after this float resolution pass.
                let required = (sides[a] + sides[b]) / 2.0 + spacing + 1.0;
                let delta = pos[b] - pos[a];
                let dist = delta.length();
                if dist < required {
                    moved = true;
                    let dir = if dist > 1e-4 {
                        delta / dist
                    } else {
                        Vec2::new(1.0, 0.0)
                    };
                    let push = dir * (required - dist) / 2.0;
                    *pos.get_mut(a).unwrap() -= push;
                    *pos.get_mut(b).unwrap() += push;
                }
            }
        }
        if !moved {
            break;
        }
    }
}

/// Translate every pose and path point so no coordinate is negative, then
/// recompute `Bounds` from the translated values (`spec.md` §9:
/// coordinate normalisation must never infer bounds from pre-normalisation
/// values).
fn normalise(
    poses: &mut IndexMap<String, Pose>,
    paths: &mut IndexMap<String, Path>,
    sides: &IndexMap<String, f32>,
) -> Bounds {
    let mut min_x = i32::MAX;
    let mut min_y = i32::MAX;

    for (id, pose) in poses.iter() {
        let side = sides[id] as i32;
        let (c_min, _) = pose.corners(side);
        min_x = min_x.min(c_min.x);
        min_y = min_y.min(c_min.y);
    }
    for path in paths.values() {
        for p in path {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
        }
    }

    let dx = if min_x < 0 { -min_x } else { 0 };
    let dy = if min_y < 0 { -min_y } else { 0 };

    if dx != 0 || dy != 0 {
        for pose in poses.values_mut() {
            pose.x += dx;
            pose.y += dy;
        }
        for path in paths.values_mut() {
            for p in path.iter_mut() {
                p.x += dx;
                p.y += dy;
            }
        }
    }

    let mut max_x = i32::MIN;
    let mut max_y = i32::MIN;
    let mut bmin_x = i32::MAX;
    let mut bmin_y = i32::MAX;
    for (id, pose) in poses.iter() {
        let side = sides[id] as i32;
        let (c_min, c_max) = pose.corners(side);
        bmin_x = bmin_x.min(c_min.x);
        bmin_y = bmin_y.min(c_min.y);
        max_x = max_x.max(c_max.x);
        max_y = max_y.max(c_max.y);
    }
    for path in paths.values() {
        for p in path {
            bmin_x = bmin_x.min(p.x);
            bmin_y = bmin_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
    }

    if poses.is_empty() {
        return Bounds {
            min: IVec2::ZERO,
            max: IVec2::ZERO,
        };
    }

    Bounds {
        min: IVec2::new(bmin_x.max(0), bmin_y.max(0)),
        max: IVec2::new(max_x, max_y),
    }
}
