//! The Abstract Dungeon Graph (ADG): a pure, reference-free value graph of
//! rooms and connectors keyed by id.
//!
//! Grounded on the design note in `spec.md` §9 ("Cyclic graphs without
//! cyclic references"): two id-keyed stores plus a derived adjacency index.
//! Traversal helpers reuse `util::bfs`/`util::dijkstra_search`, the same
//! generic search primitives the template's `world::waypoints` module uses
//! for its own graph reachability queries.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A symbolic `(type, value)` pair a room can grant and a connector gate
/// can require, e.g. `(key, silver)`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Capability {
    pub kind: String,
    pub value: String,
}

impl Capability {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Capability {
            kind: kind.into(),
            value: value.into(),
        }
    }

    pub fn key(name: impl Into<String>) -> Self {
        Capability::new("key", name)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum Archetype {
    Start,
    Boss,
    Treasure,
    Puzzle,
    Hub,
    Corridor,
    Secret,
    Optional,
    Vendor,
    Shrine,
    Checkpoint,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum RoomSize {
    XS,
    S,
    M,
    L,
    XL,
}

impl RoomSize {
    /// Footprint side length in tiles (`spec.md` §3).
    pub fn footprint_side(self) -> i32 {
        match self {
            RoomSize::XS => 3,
            RoomSize::S => 5,
            RoomSize::M => 8,
            RoomSize::L => 12,
            RoomSize::XL => 16,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub archetype: Archetype,
    pub size: RoomSize,
    pub difficulty: f64,
    pub reward: f64,
    #[serde(default)]
    pub tags: IndexMap<String, String>,
    #[serde(default)]
    pub requirements: Vec<Capability>,
    #[serde(default)]
    pub provides: Vec<Capability>,
    pub degree_min: Option<u32>,
    pub degree_max: Option<u32>,
}

impl Room {
    pub fn new(id: impl Into<String>, archetype: Archetype, size: RoomSize) -> Self {
        Room {
            id: id.into(),
            archetype,
            size,
            difficulty: 0.0,
            reward: 0.0,
            tags: IndexMap::default(),
            requirements: Vec::new(),
            provides: Vec::new(),
            degree_min: None,
            degree_max: None,
        }
    }

    fn validate(&self) -> Result<(), GraphError> {
        if !(0.0..=1.0).contains(&self.difficulty) {
            return Err(GraphError::OutOfRange("difficulty", self.difficulty));
        }
        if !(0.0..=1.0).contains(&self.reward) {
            return Err(GraphError::OutOfRange("reward", self.reward));
        }
        if let (Some(min), Some(max)) = (self.degree_min, self.degree_max) {
            if min > max {
                return Err(GraphError::BadDegreeRange(min, max));
            }
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum ConnectorKind {
    Door,
    Corridor,
    Ladder,
    Teleporter,
    Hidden,
    OneWay,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum Visibility {
    Normal,
    Secret,
    Illusory,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Connector {
    pub id: String,
    pub from: String,
    pub to: String,
    pub kind: ConnectorKind,
    pub gate: Option<Capability>,
    pub cost: f64,
    pub visibility: Visibility,
    pub bidirectional: bool,
}

impl Connector {
    /// Whether a traveller already holding `capabilities` may traverse this
    /// connector in the `from -> to` direction.
    pub fn is_traversable(&self, capabilities: &[Capability]) -> bool {
        match &self.gate {
            None => true,
            Some(gate) => capabilities.contains(gate),
        }
    }
}

#[derive(Error, Clone, Debug)]
pub enum GraphError {
    #[error("unknown room: {0}")]
    UnknownRoom(String),
    #[error("no path from {0} to {1}")]
    NoPath(String, String),
    #[error("duplicate id: {0}")]
    DuplicateId(String),
    #[error("self loop on room {0}")]
    SelfLoop(String),
    #[error("connector cost must be positive, got {0}")]
    NonPositiveCost(f64),
    #[error("{0} out of range [0,1]: {1}")]
    OutOfRange(&'static str, f64),
    #[error("degreeMin ({0}) > degreeMax ({1})")]
    BadDegreeRange(u32, u32),
}

/// The Abstract Dungeon Graph. Rooms and connectors are stored in
/// insertion-ordered maps so iteration (and therefore any downstream
/// serialisation) is itself deterministic without needing an extra sort
/// pass at every use site.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Graph {
    pub rooms: IndexMap<String, Room>,
    pub connectors: IndexMap<String, Connector>,
    /// room id -> neighbour ids reachable by traversing out of that room.
    /// `to -> from` entries are added only when the connector is
    /// bidirectional.
    pub adjacency: IndexMap<String, Vec<String>>,
    pub seed: u64,
}

impl Graph {
    pub fn new(seed: u64) -> Self {
        Graph {
            rooms: IndexMap::default(),
            connectors: IndexMap::default(),
            adjacency: IndexMap::default(),
            seed,
        }
    }

    pub fn add_room(&mut self, room: Room) -> Result<(), GraphError> {
        if self.rooms.contains_key(&room.id) {
            return Err(GraphError::DuplicateId(room.id));
        }
        room.validate()?;
        self.adjacency.entry(room.id.clone()).or_default();
        self.rooms.insert(room.id.clone(), room);
        Ok(())
    }

    pub fn add_connector(&mut self, connector: Connector) -> Result<(), GraphError> {
        if self.connectors.contains_key(&connector.id) {
            return Err(GraphError::DuplicateId(connector.id));
        }
        if connector.from == connector.to {
            return Err(GraphError::SelfLoop(connector.from.clone()));
        }
        if !self.rooms.contains_key(&connector.from) {
            return Err(GraphError::UnknownRoom(connector.from.clone()));
        }
        if !self.rooms.contains_key(&connector.to) {
            return Err(GraphError::UnknownRoom(connector.to.clone()));
        }
        if connector.cost <= 0.0 {
            return Err(GraphError::NonPositiveCost(connector.cost));
        }

        self.adjacency
            .entry(connector.from.clone())
            .or_default()
            .push(connector.to.clone());
        if connector.bidirectional {
            self.adjacency
                .entry(connector.to.clone())
                .or_default()
                .push(connector.from.clone());
        }

        self.connectors.insert(connector.id.clone(), connector);
        Ok(())
    }

    /// Remove a room and every connector incident to it, purging it from
    /// adjacency on both ends.
    pub fn remove_room(&mut self, id: &str) {
        if self.rooms.shift_remove(id).is_none() {
            return;
        }

        let doomed: Vec<String> = self
            .connectors
            .iter()
            .filter(|(_, c)| c.from == id || c.to == id)
            .map(|(cid, _)| cid.clone())
            .collect();
        for cid in doomed {
            self.connectors.shift_remove(&cid);
        }

        self.adjacency.shift_remove(id);
        for neighbours in self.adjacency.values_mut() {
            neighbours.retain(|n| n != id);
        }
    }

    fn neighbours(&self, id: &str) -> impl Iterator<Item = &str> {
        self.adjacency
            .get(id)
            .into_iter()
            .flatten()
            .map(|s| s.as_str())
    }

    /// Shortest path from `from` to `to` (inclusive of both ends), by
    /// number of edges, ties broken by adjacency insertion order.
    pub fn get_path(&self, from: &str, to: &str) -> Result<Vec<String>, GraphError> {
        if from == to {
            if !self.rooms.contains_key(from) {
                return Err(GraphError::UnknownRoom(from.to_string()));
            }
            return Ok(vec![from.to_string()]);
        }
        if !self.rooms.contains_key(from) {
            return Err(GraphError::UnknownRoom(from.to_string()));
        }
        if !self.rooms.contains_key(to) {
            return Err(GraphError::UnknownRoom(to.to_string()));
        }

        let mut prev: util::HashMap<String, String> = util::HashMap::default();
        let mut found = false;
        for (node, _) in util::bfs(
            |n: &String| self.neighbours(n).map(|s| s.to_string()).collect::<Vec<_>>(),
            [from.to_string()],
        ) {
            if node == to {
                found = true;
                break;
            }
            for n in self.neighbours(&node) {
                prev.entry(n.to_string()).or_insert_with(|| node.clone());
            }
        }

        if !found {
            return Err(GraphError::NoPath(from.to_string(), to.to_string()));
        }

        let mut path = vec![to.to_string()];
        let mut cur = to.to_string();
        while cur != from {
            let Some(p) = prev.get(&cur) else {
                return Err(GraphError::NoPath(from.to_string(), to.to_string()));
            };
            cur = p.clone();
            path.push(cur.clone());
        }
        path.reverse();
        Ok(path)
    }

    /// Every room reachable from `from` (including `from` itself), in BFS
    /// discovery order.
    pub fn get_reachable(&self, from: &str) -> Result<Vec<String>, GraphError> {
        if !self.rooms.contains_key(from) {
            return Err(GraphError::UnknownRoom(from.to_string()));
        }
        Ok(util::bfs(
            |n: &String| self.neighbours(n).map(|s| s.to_string()).collect::<Vec<_>>(),
            [from.to_string()],
        )
        .map(|(n, _)| n)
        .collect())
    }

    /// Strong connectivity: every room reachable from an arbitrary seed
    /// room by following directed edges.
    pub fn is_connected(&self) -> bool {
        let Some(seed) = self.rooms.keys().next() else {
            return true;
        };
        match self.get_reachable(seed) {
            Ok(reached) => reached.len() == self.rooms.len(),
            Err(_) => false,
        }
    }

    /// Weak connectivity: every room reachable from an arbitrary seed room
    /// when edges are treated as undirected.
    pub fn is_weakly_connected(&self) -> bool {
        let Some(seed) = self.rooms.keys().next() else {
            return true;
        };

        let mut undirected: util::HashMap<String, Vec<String>> = util::HashMap::default();
        for c in self.connectors.values() {
            undirected
                .entry(c.from.clone())
                .or_default()
                .push(c.to.clone());
            undirected
                .entry(c.to.clone())
                .or_default()
                .push(c.from.clone());
        }

        let reached: util::HashSet<String> = util::bfs(
            |n: &String| {
                undirected
                    .get(n)
                    .cloned()
                    .unwrap_or_default()
                    .into_iter()
            },
            [seed.clone()],
        )
        .map(|(n, _)| n)
        .collect();

        reached.len() == self.rooms.len()
    }

    /// Count of independent cycles in the undirected projection, via DFS
    /// back-edge detection that skips the edge back to the immediate
    /// parent (so a single bidirectional connector is not reported as a
    /// 2-cycle).
    pub fn get_cycles(&self) -> usize {
        let mut undirected: IndexMap<String, Vec<String>> = IndexMap::default();
        for id in self.rooms.keys() {
            undirected.entry(id.clone()).or_default();
        }
        for c in self.connectors.values() {
            undirected.entry(c.from.clone()).or_default().push(c.to.clone());
            undirected.entry(c.to.clone()).or_default().push(c.from.clone());
        }

        let mut visited: util::HashSet<String> = util::HashSet::default();
        let mut back_edges = 0usize;

        let mut ids: Vec<String> = self.rooms.keys().cloned().collect();
        ids.sort();

        for start in ids {
            if !visited.contains(&start) {
                dfs_count_back_edges(&undirected, &start, None, &mut visited, &mut back_edges);
            }
        }

        // Each undirected edge is scanned once from each endpoint (tree
        // edges are only ever discovered from one side, back edges are
        // counted from both), so halve the raw tally to get distinct
        // cycle-closing edges.
        back_edges / 2
    }
}

fn dfs_count_back_edges(
    undirected: &IndexMap<String, Vec<String>>,
    node: &str,
    parent: Option<&str>,
    visited: &mut util::HashSet<String>,
    back_edges: &mut usize,
) {
    visited.insert(node.to_string());
    let Some(neighbours) = undirected.get(node) else {
        return;
    };
    for n in neighbours {
        if Some(n.as_str()) == parent {
            continue;
        }
        if visited.contains(n) {
            *back_edges += 1;
        } else {
            dfs_count_back_edges(undirected, n, Some(node), visited, back_edges);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn room(id: &str) -> Room {
        Room::new(id, Archetype::Hub, RoomSize::M)
    }

    fn connector(id: &str, from: &str, to: &str, bidi: bool) -> Connector {
        Connector {
            id: id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            kind: ConnectorKind::Door,
            gate: None,
            cost: 1.0,
            visibility: Visibility::Normal,
            bidirectional: bidi,
        }
    }

    #[test]
    fn path_from_room_to_itself() {
        let mut g = Graph::new(1);
        g.add_room(room("a")).unwrap();
        assert_eq!(g.get_path("a", "a").unwrap(), vec!["a"]);
    }

    #[test]
    fn unknown_endpoint_fails() {
        let g = Graph::new(1);
        assert!(matches!(
            g.get_path("a", "b"),
            Err(GraphError::UnknownRoom(_))
        ));
    }

    #[test]
    fn no_path_fails() {
        let mut g = Graph::new(1);
        g.add_room(room("a")).unwrap();
        g.add_room(room("b")).unwrap();
        assert!(matches!(g.get_path("a", "b"), Err(GraphError::NoPath(_, _))));
    }

    #[test]
    fn shortest_path_through_chain() {
        let mut g = Graph::new(1);
        for id in ["a", "b", "c"] {
            g.add_room(room(id)).unwrap();
        }
        g.add_connector(connector("c1", "a", "b", true)).unwrap();
        g.add_connector(connector("c2", "b", "c", true)).unwrap();
        assert_eq!(g.get_path("a", "c").unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn one_way_connector_restricts_direction() {
        let mut g = Graph::new(1);
        g.add_room(room("a")).unwrap();
        g.add_room(room("b")).unwrap();
        g.add_connector(connector("c1", "a", "b", false)).unwrap();
        assert!(g.get_path("a", "b").is_ok());
        assert!(g.get_path("b", "a").is_err());
    }

    #[test]
    fn remove_room_cascades() {
        let mut g = Graph::new(1);
        for id in ["a", "b", "c"] {
            g.add_room(room(id)).unwrap();
        }
        g.add_connector(connector("c1", "a", "b", true)).unwrap();
        g.add_connector(connector("c2", "b", "c", true)).unwrap();

        g.remove_room("b");

        assert!(!g.rooms.contains_key("b"));
        assert!(!g.connectors.contains_key("c1"));
        assert!(!g.connectors.contains_key("c2"));
        assert!(g.adjacency.get("a").unwrap().is_empty());
    }

    #[test]
    fn weak_vs_strong_connectivity() {
        let mut g = Graph::new(1);
        g.add_room(room("a")).unwrap();
        g.add_room(room("b")).unwrap();
        g.add_connector(connector("c1", "a", "b", false)).unwrap();

        assert!(g.is_weakly_connected());
        assert!(!g.is_connected());
    }

    #[test]
    fn cycle_count_zero_for_tree() {
        let mut g = Graph::new(1);
        for id in ["a", "b", "c"] {
            g.add_room(room(id)).unwrap();
        }
        g.add_connector(connector("c1", "a", "b", true)).unwrap();
        g.add_connector(connector("c2", "a", "c", true)).unwrap();
        assert_eq!(g.get_cycles(), 0);
    }

    #[test]
    fn cycle_count_one_for_triangle() {
        let mut g = Graph::new(1);
        for id in ["a", "b", "c"] {
            g.add_room(room(id)).unwrap();
        }
        g.add_connector(connector("c1", "a", "b", true)).unwrap();
        g.add_connector(connector("c2", "b", "c", true)).unwrap();
        g.add_connector(connector("c3", "c", "a", true)).unwrap();
        assert_eq!(g.get_cycles(), 1);
    }

    #[test]
    fn rejects_self_loop() {
        let mut g = Graph::new(1);
        g.add_room(room("a")).unwrap();
        assert!(matches!(
            g.add_connector(connector("c1", "a", "a", true)),
            Err(GraphError::SelfLoop(_))
        ));
    }

    #[test]
    fn rejects_duplicate_room_id() {
        let mut g = Graph::new(1);
        g.add_room(room("a")).unwrap();
        assert!(matches!(
            g.add_room(room("a")),
            Err(GraphError::DuplicateId(_))
        ));
    }
}
