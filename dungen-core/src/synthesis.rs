//! Grammar-style ADG synthesis (`spec.md` §4.3).
//!
//! Builds a Start -> ... -> Boss spine, attaches hub-and-spoke branches up
//! to the sampled room count, adds extra edges for branching, places
//! key/lock gates with a capability-BFS circularity check, assigns
//! archetypes (Secret/Optional/themed extras), and finally assigns
//! per-room difficulty along the configured pacing curve.
//!
//! Every loop that draws from `rng` or mutates the graph iterates a stable,
//! pre-sorted id order, per the determinism discipline in `spec.md` §9.

use crate::config::Config;
use crate::error::{GenError, Stage};
use crate::graph::{Archetype, Capability, Connector, ConnectorKind, Graph, Room, RoomSize, Visibility};
use crate::rng::DungeonRng;
use crate::validator::capability_bfs_distance;

const MAX_RETRY_ATTEMPTS: u32 = 16;

/// Synthesise a connected ADG satisfying `config`'s size/branching/key/
/// archetype/pacing constraints, retrying a bounded number of times on
/// hard-constraint failure. Each retry reseeds from `rng` deterministically
/// (`spec.md` §9: retry policy).
pub fn synthesize(rng: &mut DungeonRng, config: &Config) -> Result<Graph, GenError> {
    check_feasible(config)?;

    for attempt in 0..MAX_RETRY_ATTEMPTS {
        let mut attempt_rng = rng.sub_rng(attempt);
        match try_synthesize_once(&mut attempt_rng, config) {
            Ok(graph) => return Ok(graph),
            Err(SynthesisFailure::Retry(reason)) => {
                log::debug!("synthesis attempt {attempt} failed, retrying: {reason}");
                continue;
            }
        }
    }

    Err(GenError::RetryExhausted(Stage::Synthesis).in_stage(Stage::Synthesis))
}

enum SynthesisFailure {
    Retry(String),
}

/// Conservative upfront feasibility check that does not depend on any RNG
/// draw: there must be enough room budget, even in the worst case (minimum
/// room count), for the spine plus every key's provider rooms.
fn check_feasible(config: &Config) -> Result<(), GenError> {
    let total_providers: u32 = config.keys.iter().map(|k| k.count).sum();
    let min_spine = (config.keys.len() as u32 + 1).max(2);
    if total_providers + min_spine > config.size.rooms_min {
        return Err(GenError::InfeasibleConfig(format!(
            "{} key provider rooms plus a {}-room spine exceed the minimum room budget of {}",
            total_providers, min_spine, config.size.rooms_min
        ))
        .in_stage(Stage::Synthesis));
    }
    Ok(())
}

struct Spine {
    ids: Vec<String>,
}

fn try_synthesize_once(rng: &mut DungeonRng, config: &Config) -> Result<Graph, SynthesisFailure> {
    let span = config.size.rooms_max - config.size.rooms_min + 1;
    let room_count = config.size.rooms_min + rng.u64_below(span as u64) as u32;

    let min_spine = (config.keys.len() as u32 + 1).max(2);
    let l = (2 + rng.u64_below(3) as u32).max(min_spine).min(room_count);

    let ids: Vec<String> = (0..room_count).map(|i| format!("room-{i:04}")).collect();

    let mut graph = Graph::new(rng.u64());

    for (i, id) in ids.iter().enumerate() {
        let archetype = if i == 0 {
            Archetype::Start
        } else if i as u32 == l - 1 {
            Archetype::Boss
        } else if (i as u32) < l {
            Archetype::Hub
        } else {
            Archetype::Corridor
        };
        graph
            .add_room(Room::new(id.clone(), archetype, RoomSize::M))
            .map_err(|e| SynthesisFailure::Retry(e.to_string()))?;
    }

    let spine = Spine {
        ids: ids[..l as usize].to_vec(),
    };

    for i in 0..(l as usize - 1) {
        graph
            .add_connector(Connector {
                id: format!("spine-{i:04}"),
                from: spine.ids[i].clone(),
                to: spine.ids[i + 1].clone(),
                kind: ConnectorKind::Corridor,
                gate: None,
                cost: 1.0,
                visibility: Visibility::Normal,
                bidirectional: true,
            })
            .map_err(|e| SynthesisFailure::Retry(e.to_string()))?;
    }

    // anchor[id] = the spine room that difficulty/branch attachment traces
    // back to.
    let mut anchor: util::HashMap<String, String> = util::HashMap::default();
    for id in &spine.ids {
        anchor.insert(id.clone(), id.clone());
    }

    // Attach key-provider rooms directly off the spine room immediately
    // before their gate, so they are always reachable without the key
    // they provide.
    let mut next_extra = l as usize;
    for (key_idx, key) in config.keys.iter().enumerate() {
        let gate_edge = key_idx.min(spine.ids.len() - 2);
        let anchor_room = spine.ids[gate_edge].clone();

        for _ in 0..key.count {
            if next_extra >= ids.len() {
                return Err(SynthesisFailure::Retry(
                    "ran out of rooms for key providers".into(),
                ));
            }
            let room_id = ids[next_extra].clone();
            next_extra += 1;

            let mut room = Room::new(room_id.clone(), Archetype::Treasure, RoomSize::S);
            room.provides.push(Capability::key(key.name.as_str()));
            graph
                .add_room(room)
                .map_err(|e| SynthesisFailure::Retry(e.to_string()))?;
            graph
                .add_connector(Connector {
                    id: format!("keylink-{room_id}"),
                    from: anchor_room.clone(),
                    to: room_id.clone(),
                    kind: ConnectorKind::Door,
                    gate: None,
                    cost: 1.0,
                    visibility: Visibility::Normal,
                    bidirectional: true,
                })
                .map_err(|e| SynthesisFailure::Retry(e.to_string()))?;
            anchor.insert(room_id, anchor_room.clone());
        }

        graph
            .connectors
            .get_mut(&format!("spine-{gate_edge:04}"))
            .expect("spine connector must exist")
            .gate = Some(Capability::key(key.name.as_str()));
    }

    // Capability-aware circularity check: every key provider must be
    // reachable from Start using only the strictly smaller capability set
    // (i.e. without the key it itself grants).
    for key in &config.keys {
        let forbidden = Capability::key(key.name.as_str());
        let reachable_without = capability_bfs_distance(&graph, &spine.ids[0], &[], &forbidden);
        let providers: Vec<&str> = graph
            .rooms
            .values()
            .filter(|r| r.provides.contains(&forbidden))
            .map(|r| r.id.as_str())
            .collect();
        if providers.is_empty() || !providers.iter().all(|p| reachable_without.contains(*p)) {
            return Err(SynthesisFailure::Retry(format!(
                "key '{}' has a circular or unreachable dependency",
                key.name
            )));
        }
    }

    // Attach remaining rooms as hub-and-spoke branches off already-placed
    // rooms, processed in ascending id order.
    let mut placed: Vec<String> = graph.rooms.keys().cloned().collect();
    placed.sort();

    for room_id in ids[next_extra..].iter() {
        let parent_idx = rng.u64_below(placed.len() as u64) as usize;
        let parent = placed[parent_idx].clone();
        let parent_anchor = anchor.get(&parent).cloned().unwrap_or_else(|| parent.clone());

        graph
            .add_room(Room::new(room_id.clone(), Archetype::Corridor, RoomSize::S))
            .map_err(|e| SynthesisFailure::Retry(e.to_string()))?;
        graph
            .add_connector(Connector {
                id: format!("branch-{room_id}"),
                from: parent.clone(),
                to: room_id.clone(),
                kind: ConnectorKind::Door,
                gate: None,
                cost: 1.0,
                visibility: Visibility::Normal,
                bidirectional: true,
            })
            .map_err(|e| SynthesisFailure::Retry(e.to_string()))?;

        anchor.insert(room_id.clone(), parent_anchor);
        placed.push(room_id.clone());
        placed.sort();
    }

    add_branching_edges(rng, &mut graph, config);
    assign_archetypes(rng, &mut graph, &spine, config);
    assign_pacing(rng, &mut graph, &spine, &anchor, config);

    if !graph.is_weakly_connected() && !config.allow_disconnected {
        return Err(SynthesisFailure::Retry("graph not weakly connected".into()));
    }

    Ok(graph)
}

fn current_avg_degree(graph: &Graph) -> f64 {
    if graph.rooms.is_empty() {
        return 0.0;
    }
    2.0 * graph.connectors.len() as f64 / graph.rooms.len() as f64
}

fn degree_of(graph: &Graph, id: &str) -> usize {
    graph.adjacency.get(id).map(|n| n.len()).unwrap_or(0)
}

fn add_branching_edges(rng: &mut DungeonRng, graph: &mut Graph, config: &Config) {
    let mut ids: Vec<String> = graph.rooms.keys().cloned().collect();
    ids.sort();

    let mut existing: util::HashSet<(String, String)> = util::HashSet::default();
    for c in graph.connectors.values() {
        existing.insert(normalised_pair(&c.from, &c.to));
    }

    let max_attempts = ids.len() * (config.branching.max as usize) * 4 + 16;
    let mut attempts = 0usize;
    let mut next_id = 0u64;

    while current_avg_degree(graph) < config.branching.avg && attempts < max_attempts {
        attempts += 1;
        if ids.len() < 2 {
            break;
        }
        let i = rng.u64_below(ids.len() as u64) as usize;
        let j = rng.u64_below(ids.len() as u64) as usize;
        if i == j {
            continue;
        }
        let (a, b) = (ids[i].clone(), ids[j].clone());
        if degree_of(graph, &a) >= config.branching.max as usize
            || degree_of(graph, &b) >= config.branching.max as usize
        {
            continue;
        }
        let pair = normalised_pair(&a, &b);
        if existing.contains(&pair) {
            continue;
        }

        let id = format!("loop-{next_id:04}");
        next_id += 1;
        if graph
            .add_connector(Connector {
                id,
                from: a.clone(),
                to: b.clone(),
                kind: ConnectorKind::Corridor,
                gate: None,
                cost: 1.0,
                visibility: Visibility::Normal,
                bidirectional: true,
            })
            .is_ok()
        {
            existing.insert(pair);
        }
    }
}

fn normalised_pair(a: &str, b: &str) -> (String, String) {
    if a < b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

fn assign_archetypes(rng: &mut DungeonRng, graph: &mut Graph, spine: &Spine, config: &Config) {
    let spine_set: util::HashSet<&str> = spine.ids.iter().map(|s| s.as_str()).collect();

    // Every room already assigned an archetype other than plain Corridor
    // extras is left untouched; only generic filler rooms are eligible for
    // Secret/Optional/themed reassignment.
    let mut extras: Vec<String> = graph
        .rooms
        .values()
        .filter(|r| !spine_set.contains(r.id.as_str()) && matches!(r.archetype, Archetype::Corridor))
        .map(|r| r.id.clone())
        .collect();
    extras.sort();
    rng.shuffle(&mut extras);

    let total = graph.rooms.len() as f64;
    let secret_n = (total * config.secret_density).round() as usize;
    let optional_n = (total * config.optional_ratio).round() as usize;

    let secret_n = secret_n.min(extras.len());
    let (secret, rest) = extras.split_at(secret_n);
    let optional_n = optional_n.min(rest.len());
    let (optional, themed) = rest.split_at(optional_n);

    for id in secret {
        if let Some(room) = graph.rooms.get_mut(id) {
            room.archetype = Archetype::Secret;
        }
        // Mark the connector that leads to this secret room as hidden.
        let incoming: Vec<String> = graph
            .connectors
            .values()
            .filter(|c| c.to == *id || (c.bidirectional && c.from == *id))
            .map(|c| c.id.clone())
            .collect();
        for cid in incoming {
            if let Some(c) = graph.connectors.get_mut(&cid) {
                c.visibility = Visibility::Secret;
                c.kind = ConnectorKind::Hidden;
            }
        }
    }

    for id in optional {
        if let Some(room) = graph.rooms.get_mut(id) {
            room.archetype = Archetype::Optional;
        }
    }

    const THEMED: [Archetype; 5] = [
        Archetype::Puzzle,
        Archetype::Vendor,
        Archetype::Shrine,
        Archetype::Checkpoint,
        Archetype::Corridor,
    ];
    for id in themed {
        let pick = THEMED[rng.u64_below(THEMED.len() as u64) as usize];
        if let Some(room) = graph.rooms.get_mut(id) {
            room.archetype = pick;
        }
    }
}

fn assign_pacing(
    rng: &mut DungeonRng,
    graph: &mut Graph,
    spine: &Spine,
    anchor: &util::HashMap<String, String>,
    config: &Config,
) {
    let l = spine.ids.len();
    let variance = config.pacing.variance;

    let mut spine_difficulty: util::HashMap<String, f64> = util::HashMap::default();
    for (i, id) in spine.ids.iter().enumerate() {
        let progress = if l <= 1 { 0.0 } else { i as f64 / (l - 1) as f64 };
        let expected = config.pacing.curve.expected(progress);
        let eps = (rng.f64_unit() * 2.0 - 1.0) * variance;
        let difficulty = (expected + eps).clamp(0.0, 1.0);
        spine_difficulty.insert(id.clone(), difficulty);
        if let Some(room) = graph.rooms.get_mut(id) {
            room.difficulty = difficulty;
        }
    }

    let mut off_spine: Vec<String> = graph
        .rooms
        .keys()
        .filter(|id| !spine_difficulty.contains_key(*id))
        .cloned()
        .collect();
    off_spine.sort();

    for id in off_spine {
        let anchor_id = anchor.get(&id).cloned().unwrap_or_else(|| spine.ids[0].clone());
        let base = spine_difficulty.get(&anchor_id).copied().unwrap_or(0.0);
        let eps = (rng.f64_unit() * 2.0 - 1.0) * variance;
        let difficulty = (base + eps).clamp(0.0, 1.0);
        if let Some(room) = graph.rooms.get_mut(&id) {
            room.difficulty = difficulty;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{Config, KeyConfig, PacingConfig, PacingCurve};
    use pretty_assertions::assert_eq;

    fn small_config() -> Config {
        let mut c = Config::default();
        c.size.rooms_min = 20;
        c.size.rooms_max = 30;
        c
    }

    #[test]
    fn produces_room_count_within_bounds() {
        let config = small_config();
        let mut rng = DungeonRng::derive(12345, "synthesis", config.canonical_hash());
        let graph = synthesize(&mut rng, &config).unwrap();
        assert!(graph.rooms.len() as u32 >= config.size.rooms_min);
        assert!(graph.rooms.len() as u32 <= config.size.rooms_max);
    }

    #[test]
    fn has_exactly_one_start_and_at_least_one_boss() {
        let config = small_config();
        let mut rng = DungeonRng::derive(1, "synthesis", config.canonical_hash());
        let graph = synthesize(&mut rng, &config).unwrap();
        let starts = graph
            .rooms
            .values()
            .filter(|r| matches!(r.archetype, Archetype::Start))
            .count();
        let bosses = graph
            .rooms
            .values()
            .filter(|r| matches!(r.archetype, Archetype::Boss))
            .count();
        assert_eq!(starts, 1);
        assert!(bosses >= 1);
    }

    #[test]
    fn is_deterministic_for_same_seed() {
        let config = small_config();
        let hash = config.canonical_hash();
        let mut rng_a = DungeonRng::derive(777, "synthesis", hash);
        let mut rng_b = DungeonRng::derive(777, "synthesis", hash);
        let a = synthesize(&mut rng_a, &config).unwrap();
        let b = synthesize(&mut rng_b, &config).unwrap();
        assert_eq!(a.rooms.len(), b.rooms.len());
        assert_eq!(
            a.rooms.keys().collect::<Vec<_>>(),
            b.rooms.keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn keys_are_reachable_before_their_lock() {
        let mut config = small_config();
        config.keys = vec![
            KeyConfig {
                name: "silver".into(),
                count: 1,
            },
            KeyConfig {
                name: "gold".into(),
                count: 1,
            },
        ];
        let mut rng = DungeonRng::derive(42, "synthesis", config.canonical_hash());
        let graph = synthesize(&mut rng, &config).unwrap();

        for key in &config.keys {
            let cap = Capability::key(key.name.as_str());
            let start = graph
                .rooms
                .values()
                .find(|r| matches!(r.archetype, Archetype::Start))
                .unwrap();
            let reachable = capability_bfs_distance(&graph, &start.id, &[], &cap);
            let provider = graph
                .rooms
                .values()
                .find(|r| r.provides.contains(&cap))
                .unwrap();
            assert!(reachable.contains(provider.id.as_str()));
        }
    }

    #[test]
    fn rejects_infeasible_key_count() {
        let mut config = small_config();
        config.size.rooms_min = 10;
        config.size.rooms_max = 10;
        config.keys = vec![KeyConfig {
            name: "too-many".into(),
            count: 9,
        }];
        let mut rng = DungeonRng::derive(1, "synthesis", config.canonical_hash());
        assert!(matches!(
            synthesize(&mut rng, &config),
            Err(GenError::InfeasibleConfig(_))
        ));
    }

    #[test]
    fn pacing_is_monotonic_for_linear_zero_variance() {
        let mut config = small_config();
        config.pacing = PacingConfig {
            curve: PacingCurve::Linear,
            variance: 0.0,
        };
        let mut rng = DungeonRng::derive(9, "synthesis", config.canonical_hash());
        let graph = synthesize(&mut rng, &config).unwrap();

        let start = graph
            .rooms
            .values()
            .find(|r| matches!(r.archetype, Archetype::Start))
            .unwrap();
        let boss = graph
            .rooms
            .values()
            .find(|r| matches!(r.archetype, Archetype::Boss))
            .unwrap();
        let path = graph.get_path(&start.id, &boss.id).unwrap();
        let difficulties: Vec<f64> = path.iter().map(|id| graph.rooms[id].difficulty).collect();
        for w in difficulties.windows(2) {
            assert!(w[1] >= w[0] - 1e-9);
        }
    }
}
