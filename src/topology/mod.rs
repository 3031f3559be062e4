//! # Topology Store
//!
//! Fixed node/edge model of the transmission network. The structure is
//! built once at startup and never changes afterwards; only the live
//! electrical attributes on nodes and edges are rewritten each tick.

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Beta, Distribution, Exp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub type NodeId = usize;

/// Errors raised while building the network. Fatal at startup only.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("could not build a connected grid after {attempts} attempts")]
    ConstructionExhausted { attempts: u32 },

    #[error("invalid topology configuration: {0}")]
    InvalidConfig(String),
}

/// Random-construction parameters for the network.
#[derive(Debug, Clone, Deserialize)]
pub struct TopologyConfig {
    /// Total number of nodes (generators + substations).
    pub node_count: usize,
    /// Number of generator nodes; they take ids `0..generator_count`.
    pub generator_count: usize,
    /// Probability that any unordered node pair gets a transmission line.
    pub edge_probability: f64,
    /// Retry budget for producing a connected graph before failing.
    pub max_build_attempts: u32,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            node_count: 8,
            generator_count: 2,
            edge_probability: 0.5,
            max_build_attempts: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NodeRole {
    Generator,
    Substation,
}

/// A generator or substation. Identity fields (`id`, `name`, `role`,
/// baselines) are fixed at construction; `voltage_kv` and
/// `current_demand_mw` are rewritten every tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub role: NodeRole,
    /// Nameplate output in MW. 0 for substations.
    pub base_power_mw: f64,
    /// Contracted baseline demand in MW. 0 for generators.
    pub baseline_demand_mw: f64,
    /// Bus voltage in kV, resampled each tick.
    pub voltage_kv: f64,
    /// Served demand in MW this tick. Always 0 for generators.
    pub current_demand_mw: f64,
}

impl Node {
    pub fn is_generator(&self) -> bool {
        self.role == NodeRole::Generator
    }

    pub fn is_substation(&self) -> bool {
        self.role == NodeRole::Substation
    }
}

/// Unordered node pair identifying a transmission line. `a <= b` always.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    pub a: NodeId,
    pub b: NodeId,
}

impl EdgeKey {
    pub fn new(u: NodeId, v: NodeId) -> Self {
        if u <= v {
            Self { a: u, b: v }
        } else {
            Self { a: v, b: u }
        }
    }

    /// The endpoint opposite to `id`, if `id` is an endpoint at all.
    pub fn other(&self, id: NodeId) -> Option<NodeId> {
        if id == self.a {
            Some(self.b)
        } else if id == self.b {
            Some(self.a)
        } else {
            None
        }
    }
}

/// Static mechanical/electrical wear proxies for a line, fixed at
/// construction and fed to the risk oracle alongside live readings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WearProfile {
    pub age_years: f64,
    pub vibration_mm_s: f64,
    pub corrosion_index: f64,
    pub harmonic_distortion_pct: f64,
}

/// A transmission line. Everything except `key`, `wear` and the
/// initial risk prior is regenerated each tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub key: EdgeKey,
    pub wear: WearProfile,
    pub resistance_ohm: f64,
    pub current_a: f64,
    pub temperature_c: f64,
    pub power_flow_mw: f64,
    /// Failure probability in [0, 1], written by the risk oracle.
    /// Starts at a conservative 0.5 prior until first scored.
    pub risk: f64,
    /// Predicted failure mode when risk is elevated.
    pub failure_type: Option<String>,
}

/// Named roster matching the reference 8-node network.
const DEFAULT_GENERATORS: &[(&str, f64)] = &[
    ("North Power Plant", 150.0),
    ("South Thermal Station", 140.0),
];

const DEFAULT_SUBSTATIONS: &[(&str, f64)] = &[
    ("Downtown Substation", 45.0),
    ("Uptown Substation", 52.0),
    ("Industrial Zone Station", 75.0),
    ("Residential Hub", 38.0),
    ("Shopping Complex Node", 41.0),
    ("University Campus Hub", 48.0),
];

/// The immutable network structure plus live attributes.
#[derive(Debug, Clone)]
pub struct Topology {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    index: HashMap<EdgeKey, usize>,
    adjacency: Vec<Vec<(NodeId, usize)>>,
}

impl Topology {
    /// Build a random connected network. Retries up to
    /// `max_build_attempts` times and fails with
    /// [`TopologyError::ConstructionExhausted`] rather than looping
    /// forever on a pathological configuration.
    pub fn build(config: &TopologyConfig, rng: &mut StdRng) -> Result<Self, TopologyError> {
        if config.node_count < 2 {
            return Err(TopologyError::InvalidConfig(
                "node_count must be at least 2".into(),
            ));
        }
        if config.generator_count == 0 || config.generator_count >= config.node_count {
            return Err(TopologyError::InvalidConfig(format!(
                "generator_count must be in 1..{}",
                config.node_count
            )));
        }
        if !(0.0..=1.0).contains(&config.edge_probability) {
            return Err(TopologyError::InvalidConfig(
                "edge_probability must be in [0, 1]".into(),
            ));
        }

        for _ in 0..config.max_build_attempts {
            let mut pairs = Vec::new();
            for u in 0..config.node_count {
                for v in (u + 1)..config.node_count {
                    if rng.gen_bool(config.edge_probability) {
                        pairs.push(EdgeKey::new(u, v));
                    }
                }
            }
            if connected(config.node_count, &pairs) {
                let nodes = roster(config, rng);
                let edges = pairs
                    .into_iter()
                    .map(|key| new_edge(key, rng))
                    .collect::<Vec<_>>();
                return Ok(Self::from_parts(nodes, edges));
            }
        }

        Err(TopologyError::ConstructionExhausted {
            attempts: config.max_build_attempts,
        })
    }

    /// Assemble a topology from explicit parts. Does not require
    /// connectivity; used for fixtures and deterministic layouts.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let mut index = HashMap::with_capacity(edges.len());
        let mut adjacency = vec![Vec::new(); nodes.len()];
        for (i, edge) in edges.iter().enumerate() {
            index.insert(edge.key, i);
            adjacency[edge.key.a].push((edge.key.b, i));
            adjacency[edge.key.b].push((edge.key.a, i));
        }
        Self {
            nodes,
            edges,
            index,
            adjacency,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edges_mut(&mut self) -> &mut [Edge] {
        &mut self.edges
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// O(1) lookup by unordered endpoint pair.
    pub fn edge_between(&self, u: NodeId, v: NodeId) -> Option<&Edge> {
        self.index
            .get(&EdgeKey::new(u, v))
            .map(|&i| &self.edges[i])
    }

    /// Neighbors of `id` with the connecting edge index.
    pub fn neighbors(&self, id: NodeId) -> &[(NodeId, usize)] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn degree(&self, id: NodeId) -> usize {
        self.neighbors(id).len()
    }

    pub fn generator_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.is_generator())
            .map(|n| n.id)
            .collect()
    }

    pub fn substation_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.is_substation())
            .map(|n| n.id)
            .collect()
    }
}

fn roster(config: &TopologyConfig, rng: &mut StdRng) -> Vec<Node> {
    (0..config.node_count)
        .map(|id| {
            if id < config.generator_count {
                let (name, base_power_mw) = DEFAULT_GENERATORS
                    .get(id)
                    .map(|&(n, p)| (n.to_string(), p))
                    .unwrap_or_else(|| (format!("Generator {id}"), rng.gen_range(120.0..180.0)));
                Node {
                    id,
                    name,
                    role: NodeRole::Generator,
                    base_power_mw,
                    baseline_demand_mw: 0.0,
                    voltage_kv: 220.0,
                    current_demand_mw: 0.0,
                }
            } else {
                let slot = id - config.generator_count;
                let (name, baseline_demand_mw) = DEFAULT_SUBSTATIONS
                    .get(slot)
                    .map(|&(n, d)| (n.to_string(), d))
                    .unwrap_or_else(|| (format!("Substation {id}"), rng.gen_range(20.0..60.0)));
                Node {
                    id,
                    name,
                    role: NodeRole::Substation,
                    base_power_mw: 0.0,
                    baseline_demand_mw,
                    voltage_kv: 220.0,
                    current_demand_mw: baseline_demand_mw,
                }
            }
        })
        .collect()
}

fn new_edge(key: EdgeKey, rng: &mut StdRng) -> Edge {
    // Vibration is exponential (most lines are quiet, a few rattle);
    // corrosion is beta-skewed toward the low end.
    let vibration_mm_s = Exp::new(5.0_f64)
        .map(|d| d.sample(rng))
        .unwrap_or(0.2)
        .min(2.5);
    let corrosion_index = Beta::new(2.0, 5.0).map(|d| d.sample(rng)).unwrap_or(0.2);
    Edge {
        key,
        wear: WearProfile {
            age_years: rng.gen_range(0.0..20.0),
            vibration_mm_s,
            corrosion_index,
            harmonic_distortion_pct: rng.gen_range(0.5..6.0),
        },
        resistance_ohm: 0.003,
        current_a: 0.0,
        temperature_c: 25.0,
        power_flow_mw: 0.0,
        risk: 0.5,
        failure_type: None,
    }
}

fn connected(node_count: usize, pairs: &[EdgeKey]) -> bool {
    if node_count == 0 {
        return false;
    }
    let mut adjacency = vec![Vec::new(); node_count];
    for key in pairs {
        adjacency[key.a].push(key.b);
        adjacency[key.b].push(key.a);
    }
    let mut seen = vec![false; node_count];
    let mut stack = vec![0];
    seen[0] = true;
    let mut visited = 1;
    while let Some(n) = stack.pop() {
        for &m in &adjacency[n] {
            if !seen[m] {
                seen[m] = true;
                visited += 1;
                stack.push(m);
            }
        }
    }
    visited == node_count
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_build_connected_grid() {
        let topo = Topology::build(&TopologyConfig::default(), &mut rng()).unwrap();

        assert_eq!(topo.nodes().len(), 8);
        assert_eq!(topo.generator_ids(), vec![0, 1]);
        assert_eq!(topo.substation_ids(), vec![2, 3, 4, 5, 6, 7]);

        // Every node reachable from node 0
        let keys: Vec<EdgeKey> = topo.edges().iter().map(|e| e.key).collect();
        assert!(connected(8, &keys));
    }

    #[test]
    fn test_named_roster() {
        let topo = Topology::build(&TopologyConfig::default(), &mut rng()).unwrap();

        assert_eq!(topo.node(0).unwrap().name, "North Power Plant");
        assert_eq!(topo.node(4).unwrap().name, "Industrial Zone Station");
        assert_eq!(topo.node(4).unwrap().baseline_demand_mw, 75.0);
        assert_eq!(topo.node(0).unwrap().baseline_demand_mw, 0.0);
    }

    #[test]
    fn test_edge_lookup_is_unordered() {
        let topo = Topology::build(&TopologyConfig::default(), &mut rng()).unwrap();
        let edge = &topo.edges()[0];
        let (u, v) = (edge.key.a, edge.key.b);

        let forward = topo.edge_between(u, v).unwrap();
        let backward = topo.edge_between(v, u).unwrap();
        assert_eq!(forward.key, backward.key);
    }

    #[test]
    fn test_construction_retry_budget() {
        // Zero edge probability can never produce a connected graph
        let config = TopologyConfig {
            edge_probability: 0.0,
            max_build_attempts: 5,
            ..Default::default()
        };
        let err = Topology::build(&config, &mut rng()).unwrap_err();
        assert!(matches!(
            err,
            TopologyError::ConstructionExhausted { attempts: 5 }
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TopologyConfig {
            generator_count: 8,
            ..Default::default()
        };
        assert!(matches!(
            Topology::build(&config, &mut rng()),
            Err(TopologyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_role_display_lowercase() {
        assert_eq!(NodeRole::Generator.to_string(), "generator");
        assert_eq!(NodeRole::Substation.to_string(), "substation");
    }

    #[test]
    fn test_edge_key_normalizes_order() {
        assert_eq!(EdgeKey::new(5, 2), EdgeKey::new(2, 5));
        assert_eq!(EdgeKey::new(2, 5).other(2), Some(5));
        assert_eq!(EdgeKey::new(2, 5).other(7), None);
    }

    #[test]
    fn test_from_parts_allows_disconnected() {
        let config = TopologyConfig::default();
        let nodes = roster(&config, &mut rng());
        // Single edge leaves most of the grid unreachable
        let edges = vec![new_edge(EdgeKey::new(0, 2), &mut rng())];
        let topo = Topology::from_parts(nodes, edges);

        assert_eq!(topo.degree(0), 1);
        assert_eq!(topo.degree(7), 0);
        assert!(topo.edge_between(0, 2).is_some());
    }
}
