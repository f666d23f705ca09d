//! End-to-end scenarios run through the full pipeline with the reference
//! carver/placer, mirroring the concrete S1-S6 cases a generator like this
//! is expected to satisfy.

use dungen_content::{UniformCarver, WeightedContentPlacer};
use dungen_core::config::{Config, KeyConfig, PacingConfig, PacingCurve};
use dungen_core::graph::Archetype;
use dungen_core::orchestrator::CancellationToken;
use dungen_core::{generate, GenError};
use pretty_assertions::assert_eq;

fn run(config: &Config) -> Result<dungen_core::Artifact, GenError> {
    generate(config, &UniformCarver, &WeightedContentPlacer, &CancellationToken::new())
}

/// S1: repeated runs byte-equal, room count in bounds, weak-connected,
/// path length >= 2, branching factor within [1.5, 2.5].
#[test]
fn s1_repeated_runs_match_and_satisfy_bounds() {
    let mut config = Config::default();
    config.seed = 12345;
    config.size.rooms_min = 20;
    config.size.rooms_max = 30;
    config.branching.avg = 2.0;
    config.branching.max = 4;
    config.pacing = PacingConfig {
        curve: PacingCurve::Linear,
        variance: 0.1,
    };

    let a = run(&config).unwrap();
    let b = run(&config).unwrap();

    assert_eq!(
        serde_json::to_string(&a.graph).unwrap(),
        serde_json::to_string(&b.graph).unwrap()
    );

    let n = a.graph.rooms.len() as u32;
    assert!((20..=30).contains(&n));
    assert!(a.graph.is_weakly_connected());
    assert!(a.report.metrics.path_length >= 2);
    assert!((1.5..=2.5).contains(&a.report.metrics.branching_factor));
}

/// S2: a different seed produces a different neighbour set for at least
/// one room id.
#[test]
fn s2_different_seed_differs() {
    let mut config = Config::default();
    config.seed = 12345;
    config.size.rooms_min = 20;
    config.size.rooms_max = 30;

    let a = run(&config).unwrap();
    config.seed = 12346;
    let b = run(&config).unwrap();

    let differs = a.graph.adjacency.iter().any(|(id, neighbours)| {
        let mut ours = neighbours.clone();
        let mut theirs = b.graph.adjacency.get(id).cloned().unwrap_or_default();
        ours.sort();
        theirs.sort();
        ours != theirs
    }) || a.graph.rooms.len() != b.graph.rooms.len();
    assert!(differs, "expected at least one room's neighbour set to differ");
}

/// S3: exactly one silver- and one gold-providing room, both reachable
/// before their own lock, validator passes.
#[test]
fn s3_distinct_keys_each_reachable_before_their_lock() {
    let mut config = Config::default();
    config.seed = 42;
    config.size.rooms_min = 30;
    config.size.rooms_max = 40;
    config.pacing = PacingConfig {
        curve: PacingCurve::SCurve,
        variance: 0.15,
    };
    config.keys = vec![
        KeyConfig { name: "silver".into(), count: 1 },
        KeyConfig { name: "gold".into(), count: 1 },
    ];

    let artifact = run(&config).unwrap();
    assert!(artifact.report.passed, "{:?}", artifact.report.errors);

    for name in ["silver", "gold"] {
        let cap = dungen_core::graph::Capability::key(name);
        let providers: Vec<&String> = artifact
            .graph
            .rooms
            .values()
            .filter(|r| r.provides.contains(&cap))
            .map(|r| &r.id)
            .collect();
        assert_eq!(providers.len(), 1, "expected exactly one {name} provider");

        let start = artifact
            .graph
            .rooms
            .values()
            .find(|r| matches!(r.archetype, Archetype::Start))
            .unwrap();
        let reachable = dungen_core::validator::capability_bfs_distance(&artifact.graph, &start.id, &[], &cap);
        assert!(reachable.contains(providers[0].as_str()));
    }
}

/// S4: the critical-path difficulty sequence tracks the configured custom
/// pacing curve within the declared variance.
#[test]
fn s4_custom_pacing_tracks_curve_within_variance() {
    let mut config = Config::default();
    config.seed = 666;
    config.size.rooms_min = 25;
    config.size.rooms_max = 30;
    config.pacing = PacingConfig {
        curve: PacingCurve::Custom {
            points: vec![(0.0, 0.2), (0.4, 0.85), (1.0, 0.75)],
        },
        variance: 0.1,
    };

    let artifact = run(&config).unwrap();
    assert!(artifact.report.passed, "{:?}", artifact.report.errors);

    let start = artifact.graph.rooms.values().find(|r| matches!(r.archetype, Archetype::Start)).unwrap();
    let boss = artifact.graph.rooms.values().find(|r| matches!(r.archetype, Archetype::Boss)).unwrap();
    let path = artifact.graph.get_path(&start.id, &boss.id).unwrap();
    let n = path.len() - 1;
    for (i, id) in path.iter().enumerate() {
        let progress = i as f64 / n.max(1) as f64;
        let expected = config.pacing.curve.expected(progress);
        let actual = artifact.graph.rooms[id].difficulty;
        assert!(
            (actual - expected).abs() <= config.pacing.variance + 1e-9,
            "room {id} difficulty {actual} deviates from expected {expected} by more than {}",
            config.pacing.variance
        );
    }
}

/// S5: a pathological seed/spread still routes every corridor; the
/// adaptive corridor length bound is what keeps embedding from failing.
#[test]
fn s5_pathological_seed_does_not_fail_to_route() {
    let mut config = Config::default();
    config.seed = 0x4400f4;
    config.size.rooms_min = 25;
    config.size.rooms_max = 30;
    config.pacing = PacingConfig {
        curve: PacingCurve::SCurve,
        variance: 0.1,
    };

    let result = run(&config);
    assert!(!matches!(result, Err(GenError::NoValidPath(_))));
}

/// S6: a room window below the allowed minimum is rejected as
/// InvalidConfig before any RNG work happens.
#[test]
fn s6_below_minimum_room_window_is_rejected_up_front() {
    let mut config = Config::default();
    config.seed = 1;
    config.size.rooms_min = 5;
    config.size.rooms_max = 5;

    let result = run(&config);
    assert!(matches!(result, Err(GenError::InvalidConfig(_))));
}
