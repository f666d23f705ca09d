//! Stage E: constraint and reachability validation (`spec.md` §4.5).
//!
//! Hard checks gate acceptance of a generated dungeon; soft checks produce
//! scores surfaced in the report but never fail generation on their own.
//! The capability-aware BFS here is the one shared model used both by
//! synthesis (key/lock circularity checks) and by the hard solvability
//! check below.

use glam::IVec2;

use crate::config::Config;
use crate::graph::{Capability, Graph};
use crate::layout::Layout;

/// Summary statistics attached to every [`ValidationReport`].
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Metrics {
    pub branching_factor: f64,
    pub path_length: usize,
    pub cycle_count: usize,
    pub pacing_deviation: f64,
    /// Reserved for a future secret-findability model; always 0 for now.
    pub secret_findability: f64,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub metrics: Metrics,
    pub passed: bool,
}

/// BFS over `graph` from `start`, expanding through connectors a traveller
/// holding `held` capabilities (plus whatever a visited room's `provides`
/// grants) can traverse, until no new room or capability becomes reachable.
/// `forbidden`, if given, is never collected even if a visited room
/// provides it — used to answer "what can I reach *before* acquiring key
/// k".
fn capability_closure(
    graph: &Graph,
    start: &str,
    initial: &util::HashSet<Capability>,
    forbidden: Option<&Capability>,
) -> util::HashSet<String> {
    let mut held = initial.clone();
    if let Some(f) = forbidden {
        held.remove(f);
    }

    loop {
        let visited = bfs_with_capabilities(graph, start, &held);
        let mut new_held = held.clone();
        for room_id in &visited {
            if let Some(room) = graph.rooms.get(room_id) {
                for cap in &room.provides {
                    if Some(cap) != forbidden {
                        new_held.insert(cap.clone());
                    }
                }
            }
        }
        if new_held == held {
            return visited;
        }
        held = new_held;
    }
}

fn bfs_with_capabilities(
    graph: &Graph,
    start: &str,
    held: &util::HashSet<Capability>,
) -> util::HashSet<String> {
    if !graph.rooms.contains_key(start) {
        return util::HashSet::default();
    }
    let held_vec: Vec<Capability> = held.iter().cloned().collect();
    util::bfs(
        |n: &String| {
            graph
                .connectors
                .values()
                .filter_map(|c| {
                    if c.from == *n && c.is_traversable(&held_vec) {
                        Some(c.to.clone())
                    } else if c.bidirectional && c.to == *n && c.is_traversable(&held_vec) {
                        Some(c.from.clone())
                    } else {
                        None
                    }
                })
                .collect::<Vec<_>>()
        },
        [start.to_string()],
    )
    .map(|(n, _)| n)
    .collect()
}

/// Every room reachable from `start` holding `held` capabilities, treating
/// `forbidden` as never obtainable. Used by synthesis's key/lock
/// circularity check.
pub fn capability_bfs_distance(
    graph: &Graph,
    start: &str,
    held: &[Capability],
    forbidden: &Capability,
) -> util::HashSet<String> {
    capability_closure(graph, start, &held.iter().cloned().collect(), Some(forbidden))
}

/// Whether `goal` is reachable from `start` given an unlimited supply of
/// whatever capabilities rooms along the way provide.
pub fn is_solvable(graph: &Graph, start: &str, goal: &str) -> bool {
    capability_closure(graph, start, &util::HashSet::default(), None).contains(goal)
}

fn rooms_overlap(graph: &Graph, layout: &Layout, a: &str, b: &str) -> bool {
    let (Some(pose_a), Some(pose_b)) = (layout.poses.get(a), layout.poses.get(b)) else {
        return false;
    };
    let (Some(room_a), Some(room_b)) = (graph.rooms.get(a), graph.rooms.get(b)) else {
        return false;
    };
    let (min_a, max_a) = pose_a.corners(room_a.size.footprint_side());
    let (min_b, max_b) = pose_b.corners(room_b.size.footprint_side());
    boxes_overlap(min_a, max_a, min_b, max_b)
}

fn boxes_overlap(min_a: IVec2, max_a: IVec2, min_b: IVec2, max_b: IVec2) -> bool {
    min_a.x <= max_b.x && max_a.x >= min_b.x && min_a.y <= max_b.y && max_a.y >= min_b.y
}

/// Run every hard and soft check from `spec.md` §4.5 against a synthesised
/// graph and its embedding.
pub fn validate(graph: &Graph, layout: &Layout, config: &Config) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if !config.allow_disconnected && !graph.is_weakly_connected() {
        errors.push("graph is not weakly connected".to_string());
    }

    let start = graph
        .rooms
        .values()
        .find(|r| matches!(r.archetype, crate::graph::Archetype::Start));
    let bosses: Vec<&crate::graph::Room> = graph
        .rooms
        .values()
        .filter(|r| matches!(r.archetype, crate::graph::Archetype::Boss))
        .collect();

    let mut path_node_count = 0usize;
    match start {
        None => errors.push("no Start room present".to_string()),
        Some(start) => {
            if bosses.is_empty() {
                errors.push("no Boss room present".to_string());
            }
            for boss in &bosses {
                if !is_solvable(graph, &start.id, &boss.id) {
                    errors.push(format!("boss room {} is unreachable", boss.id));
                }
            }

            for key in &config.keys {
                let cap = Capability::key(key.name.as_str());
                let reachable = capability_bfs_distance(graph, &start.id, &[], &cap);
                let has_provider = graph
                    .rooms
                    .values()
                    .any(|r| r.provides.contains(&cap) && reachable.contains(r.id.as_str()));
                if !has_provider {
                    errors.push(format!("key '{}' is not reachable without itself", key.name));
                }
            }

            if let Some(boss) = bosses.first() {
                if let Ok(path) = graph.get_path(&start.id, &boss.id) {
                    path_node_count = path.len();
                }
            }
        }
    }

    let min_path = (config.size.rooms_min / 10).max(2) as usize;
    if path_node_count > 0
        && (path_node_count < min_path || path_node_count > config.size.rooms_max as usize)
    {
        errors.push(format!(
            "critical path length {path_node_count} outside [{}, {}]",
            min_path, config.size.rooms_max
        ));
    }

    let ids: Vec<&String> = layout.poses.keys().collect();
    for i in 0..ids.len() {
        for j in (i + 1)..ids.len() {
            if rooms_overlap(graph, layout, ids[i], ids[j]) {
                errors.push(format!("rooms {} and {} overlap", ids[i], ids[j]));
            }
        }
    }

    let branching_factor = if graph.rooms.is_empty() {
        0.0
    } else {
        2.0 * graph.connectors.len() as f64 / graph.rooms.len() as f64
    };
    if (branching_factor - config.branching.avg).abs() > 0.75 {
        let msg = format!(
            "branching factor {branching_factor:.2} deviates from target {:.2}",
            config.branching.avg
        );
        log::warn!("{msg}");
        warnings.push(msg);
    }

    let pacing_deviation = start
        .and_then(|s| bosses.first().map(|b| (s, b)))
        .and_then(|(s, b)| graph.get_path(&s.id, &b.id).ok())
        .map(|path| pacing_rmse(graph, config, &path))
        .unwrap_or(0.0);
    if pacing_deviation > 0.25 {
        let msg = format!("pacing deviation {pacing_deviation:.3} is high");
        log::warn!("{msg}");
        warnings.push(msg);
    }

    let metrics = Metrics {
        branching_factor,
        path_length: path_node_count.saturating_sub(1),
        cycle_count: graph.get_cycles(),
        pacing_deviation,
        secret_findability: 0.0,
    };

    ValidationReport {
        passed: errors.is_empty(),
        errors,
        warnings,
        metrics,
    }
}

fn pacing_rmse(graph: &Graph, config: &Config, path: &[String]) -> f64 {
    if path.len() < 2 {
        return 0.0;
    }
    let n = path.len() - 1;
    let mut sq_sum = 0.0;
    for (i, id) in path.iter().enumerate() {
        let progress = i as f64 / n as f64;
        let expected = config.pacing.curve.expected(progress);
        let actual = graph.rooms.get(id).map(|r| r.difficulty).unwrap_or(0.0);
        sq_sum += (actual - expected).powi(2);
    }
    (sq_sum / path.len() as f64).sqrt()
}
