//! Property-based tests for the quantified invariants a generated dungeon
//! must satisfy, independent of any concrete carver/placer.

use dungen_core::config::{Config, KeyConfig, PacingConfig, PacingCurve};
use dungen_core::embedding::{self, EmbedderConfig};
use dungen_core::graph::Archetype;
use dungen_core::rng::DungeonRng;
use dungen_core::synthesis;
use dungen_core::validator;
use proptest::prelude::*;

fn config_strategy() -> impl Strategy<Value = Config> {
    (10u32..60, 0u32..40, 1.5f64..3.0, 2u32..=5, 0.0f64..0.3).prop_map(
        |(rooms_min, extra, branching_avg, branching_max, variance)| {
            let mut c = Config::default();
            c.size.rooms_min = rooms_min;
            c.size.rooms_max = rooms_min + extra;
            c.branching.avg = branching_avg;
            c.branching.max = branching_max.max(2);
            c.pacing = PacingConfig {
                curve: PacingCurve::Linear,
                variance,
            };
            c
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property 2: room count always lands in [roomsMin, roomsMax].
    #[test]
    fn room_count_within_bounds(seed: u64, config in config_strategy()) {
        let mut rng = DungeonRng::derive(seed, "synthesis", config.canonical_hash());
        if let Ok(graph) = synthesis::synthesize(&mut rng, &config) {
            prop_assert!(graph.rooms.len() as u32 >= config.size.rooms_min);
            prop_assert!(graph.rooms.len() as u32 <= config.size.rooms_max);
        }
    }

    /// Property 3: exactly one Start, at least one Boss.
    #[test]
    fn unique_start_at_least_one_boss(seed: u64, config in config_strategy()) {
        let mut rng = DungeonRng::derive(seed, "synthesis", config.canonical_hash());
        if let Ok(graph) = synthesis::synthesize(&mut rng, &config) {
            let starts = graph.rooms.values().filter(|r| matches!(r.archetype, Archetype::Start)).count();
            let bosses = graph.rooms.values().filter(|r| matches!(r.archetype, Archetype::Boss)).count();
            prop_assert_eq!(starts, 1);
            prop_assert!(bosses >= 1);
        }
    }

    /// Property 4: the Boss is solvable from Start via capability-BFS.
    #[test]
    fn boss_is_solvable(seed: u64, config in config_strategy()) {
        let mut rng = DungeonRng::derive(seed, "synthesis", config.canonical_hash());
        if let Ok(graph) = synthesis::synthesize(&mut rng, &config) {
            let start = graph.rooms.values().find(|r| matches!(r.archetype, Archetype::Start)).unwrap();
            let boss = graph.rooms.values().find(|r| matches!(r.archetype, Archetype::Boss)).unwrap();
            prop_assert!(validator::is_solvable(&graph, &start.id, &boss.id));
        }
    }

    /// Property 6: weak connectivity holds whenever allowDisconnected is unset.
    #[test]
    fn weakly_connected_unless_allowed(seed: u64, config in config_strategy()) {
        let mut rng = DungeonRng::derive(seed, "synthesis", config.canonical_hash());
        if let Ok(graph) = synthesis::synthesize(&mut rng, &config) {
            prop_assert!(config.allow_disconnected || graph.is_weakly_connected());
        }
    }

    /// Property 11: cycleCount == 0 iff the undirected projection is a forest,
    /// i.e. edges == rooms - 1 for a connected graph with no cycles.
    #[test]
    fn cycle_count_matches_edge_surplus(seed: u64, config in config_strategy()) {
        let mut rng = DungeonRng::derive(seed, "synthesis", config.canonical_hash());
        if let Ok(graph) = synthesis::synthesize(&mut rng, &config) {
            if graph.is_weakly_connected() {
                let surplus = graph.connectors.len() as i64 - (graph.rooms.len() as i64 - 1);
                prop_assert_eq!(graph.get_cycles() == 0, surplus == 0);
            }
        }
    }

    /// Property 1: determinism. Same (seed, config) always yields the same
    /// room id set and the same per-room difficulty assignment.
    #[test]
    fn synthesis_is_deterministic(seed: u64, config in config_strategy()) {
        let hash = config.canonical_hash();
        let mut rng_a = DungeonRng::derive(seed, "synthesis", hash);
        let mut rng_b = DungeonRng::derive(seed, "synthesis", hash);
        let a = synthesis::synthesize(&mut rng_a, &config);
        let b = synthesis::synthesize(&mut rng_b, &config);
        match (a, b) {
            (Ok(ga), Ok(gb)) => {
                let ids_a: Vec<&String> = ga.rooms.keys().collect();
                let ids_b: Vec<&String> = gb.rooms.keys().collect();
                prop_assert_eq!(ids_a, ids_b);
                for id in ga.rooms.keys() {
                    prop_assert!((ga.rooms[id].difficulty - gb.rooms[id].difficulty).abs() < 1e-12);
                }
            }
            (Err(_), Err(_)) => {}
            _ => prop_assert!(false, "one run succeeded and the other failed"),
        }
    }

    /// Property 5: every configured key is reachable from Start without
    /// crossing a connector gated on that same key.
    #[test]
    fn keys_reachable_before_own_lock(seed: u64, mut config in config_strategy()) {
        config.keys = vec![KeyConfig { name: "silver".into(), count: 1 }];
        config.size.rooms_min = config.size.rooms_min.max(15);
        config.size.rooms_max = config.size.rooms_max.max(config.size.rooms_min + 5);
        let mut rng = DungeonRng::derive(seed, "synthesis", config.canonical_hash());
        if let Ok(graph) = synthesis::synthesize(&mut rng, &config) {
            let start = graph.rooms.values().find(|r| matches!(r.archetype, Archetype::Start)).unwrap();
            let cap = dungen_core::graph::Capability::key("silver");
            let reachable = validator::capability_bfs_distance(&graph, &start.id, &[], &cap);
            let has_provider = graph.rooms.values().any(|r| r.provides.contains(&cap) && reachable.contains(r.id.as_str()));
            prop_assert!(has_provider);
        }
    }

    /// Property 8/9: after embedding, every coordinate is non-negative and
    /// every corridor polyline stays within the adaptive length bound.
    #[test]
    fn embedding_coords_non_negative_and_corridors_bounded(seed: u64, config in config_strategy()) {
        let mut synth_rng = DungeonRng::derive(seed, "synthesis", config.canonical_hash());
        let synth_result = synthesis::synthesize(&mut synth_rng, &config);
        prop_assume!(synth_result.is_ok());
        let graph = synth_result.unwrap();
        let mut embed_rng = DungeonRng::derive(seed, "embedding", config.canonical_hash());
        let embed_result = embedding::embed(&mut embed_rng, &graph, &EmbedderConfig::default());
        prop_assume!(embed_result.is_ok());
        let layout = embed_result.unwrap();

        for pose in layout.poses.values() {
            prop_assert!(pose.x >= 0);
            prop_assert!(pose.y >= 0);
        }
        let max_len = embedding::adaptive_corridor_max_length(graph.rooms.len());
        for path in layout.paths.values() {
            prop_assert!(dungen_core::layout::path_length(path) <= max_len + 1e-6);
            for p in path {
                prop_assert!(p.x >= 0 && p.y >= 0);
            }
        }
    }

    /// Property 12: pacingDeviation always lands in [0, 1].
    #[test]
    fn pacing_deviation_in_unit_range(seed: u64, config in config_strategy()) {
        let mut synth_rng = DungeonRng::derive(seed, "synthesis", config.canonical_hash());
        let synth_result = synthesis::synthesize(&mut synth_rng, &config);
        prop_assume!(synth_result.is_ok());
        let graph = synth_result.unwrap();
        let mut embed_rng = DungeonRng::derive(seed, "embedding", config.canonical_hash());
        let embed_result = embedding::embed(&mut embed_rng, &graph, &EmbedderConfig::default());
        prop_assume!(embed_result.is_ok());
        let layout = embed_result.unwrap();
        let report = validator::validate(&graph, &layout, &config);
        prop_assert!(report.metrics.pacing_deviation >= 0.0 && report.metrics.pacing_deviation <= 1.0);
    }
}
