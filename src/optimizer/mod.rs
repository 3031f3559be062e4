//! # Path Optimizer
//!
//! Risk-weighted shortest-path routing. Every edge gets a scalar cost
//! `resistance + risk_weight * risk`; a single Dijkstra pass from the
//! load node ranks all candidate generators by total path cost and the
//! cheapest one wins. Weights are non-negative by construction so
//! Dijkstra is exact.
//!
//! Loss convention, applied uniformly: for a chosen path,
//! `loss_mw = demand_mw * sum(resistance_ohm)` over its hops.

use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::topology::{NodeId, Topology};

/// A delivery path from a load node to its chosen generator.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Node sequence starting at the load and ending at the generator.
    pub path: Vec<NodeId>,
    pub generator: NodeId,
    /// Total combined cost along the path.
    pub cost: f64,
    /// Total physical resistance along the path in Ohms.
    pub resistance_ohm: f64,
}

/// Outcome of routing one load node. No route is a value, not an
/// error: a disconnected substation contributes zero to aggregates.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Found(Route),
    NoRoute,
}

impl RouteOutcome {
    pub fn route(&self) -> Option<&Route> {
        match self {
            RouteOutcome::Found(route) => Some(route),
            RouteOutcome::NoRoute => None,
        }
    }
}

/// Computes minimum-cost delivery paths over the live topology.
#[derive(Debug, Clone, Copy)]
pub struct PathOptimizer {
    /// How strongly to avoid high-risk lines relative to pure
    /// transmission loss. Policy knob, not a learned parameter.
    pub risk_weight: f64,
}

impl Default for PathOptimizer {
    fn default() -> Self {
        Self { risk_weight: 10.0 }
    }
}

impl PathOptimizer {
    pub fn new(risk_weight: f64) -> Self {
        Self { risk_weight }
    }

    /// Route `source` to the cheapest reachable generator.
    pub fn route(&self, topology: &Topology, source: NodeId) -> RouteOutcome {
        let n = topology.nodes().len();
        if source >= n {
            return RouteOutcome::NoRoute;
        }

        let mut dist = vec![f64::INFINITY; n];
        let mut prev: Vec<Option<NodeId>> = vec![None; n];
        let mut heap = BinaryHeap::new();

        dist[source] = 0.0;
        heap.push(Reverse((OrderedFloat(0.0), source)));

        while let Some(Reverse((OrderedFloat(d), u))) = heap.pop() {
            if d > dist[u] {
                continue;
            }
            for &(v, edge_idx) in topology.neighbors(u) {
                let edge = &topology.edges()[edge_idx];
                let weight = edge.resistance_ohm + self.risk_weight * edge.risk;
                let next = d + weight;
                if next < dist[v] {
                    dist[v] = next;
                    prev[v] = Some(u);
                    heap.push(Reverse((OrderedFloat(next), v)));
                }
            }
        }

        let best = topology
            .generator_ids()
            .into_iter()
            .filter(|&g| dist[g].is_finite())
            .min_by_key(|&g| OrderedFloat(dist[g]));

        let Some(generator) = best else {
            return RouteOutcome::NoRoute;
        };

        // Walk predecessors back to the source, then flip so the path
        // reads load -> generator.
        let mut path = vec![generator];
        let mut cursor = generator;
        while let Some(p) = prev[cursor] {
            path.push(p);
            cursor = p;
        }
        path.reverse();

        let resistance_ohm = path
            .windows(2)
            .filter_map(|hop| topology.edge_between(hop[0], hop[1]))
            .map(|e| e.resistance_ohm)
            .sum();

        RouteOutcome::Found(Route {
            path,
            generator,
            cost: dist[generator],
            resistance_ohm,
        })
    }

    /// Transmission loss attributed to serving `demand_mw` over a path
    /// with the given total resistance.
    pub fn path_loss_mw(demand_mw: f64, resistance_ohm: f64) -> f64 {
        demand_mw * resistance_ohm
    }
}
