//! Immutable values published once per tick.
//!
//! A `GridSnapshot` and its paired `OptimizationResult` are built
//! together, swapped into the shared slot as a unit, and never mutated
//! afterwards; readers holding an old pair may keep using it safely.

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::Serialize;

use crate::risk::RiskBand;
use crate::topology::{NodeId, NodeRole, Topology};

/// One node's published state.
#[derive(Debug, Clone, Serialize)]
pub struct NodeState {
    pub id: NodeId,
    pub name: String,
    #[serde(rename = "type")]
    pub role: NodeRole,
    pub demand_mw: f64,
    pub voltage_kv: f64,
    pub degree: usize,
}

/// One transmission line's published state.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeState {
    pub source: NodeId,
    pub source_name: String,
    pub target: NodeId,
    pub target_name: String,
    pub resistance_ohm: f64,
    pub current_a: f64,
    pub temperature_c: f64,
    pub power_flow_mw: f64,
    pub risk: f64,
    pub risk_band: RiskBand,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_type: Option<String>,
}

/// Aggregate metrics for one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct GridMetrics {
    pub total_demand_mw: f64,
    pub total_nodes: usize,
    pub total_edges: usize,
    pub average_risk: f64,
    pub generators: usize,
}

/// Fully-formed view of topology + live attributes at one tick.
#[derive(Debug, Clone, Serialize)]
pub struct GridSnapshot {
    /// Strictly increasing tick counter.
    pub iteration: u64,
    pub timestamp: DateTime<Utc>,
    pub nodes: Vec<NodeState>,
    pub edges: Vec<EdgeState>,
    pub metrics: GridMetrics,
}

impl GridSnapshot {
    /// Capture the current topology state. Attributes and risks must
    /// already be written for this tick.
    pub fn capture(topology: &Topology, iteration: u64, timestamp: DateTime<Utc>) -> Self {
        let nodes: Vec<NodeState> = topology
            .nodes()
            .iter()
            .map(|n| NodeState {
                id: n.id,
                name: n.name.clone(),
                role: n.role,
                demand_mw: n.current_demand_mw,
                voltage_kv: n.voltage_kv,
                degree: topology.degree(n.id),
            })
            .collect();

        let edges: Vec<EdgeState> = topology
            .edges()
            .iter()
            .map(|e| EdgeState {
                source: e.key.a,
                source_name: topology
                    .node(e.key.a)
                    .map(|n| n.name.clone())
                    .unwrap_or_default(),
                target: e.key.b,
                target_name: topology
                    .node(e.key.b)
                    .map(|n| n.name.clone())
                    .unwrap_or_default(),
                resistance_ohm: e.resistance_ohm,
                current_a: e.current_a,
                temperature_c: e.temperature_c,
                power_flow_mw: e.power_flow_mw,
                risk: e.risk,
                risk_band: RiskBand::from_probability(e.risk),
                failure_type: e.failure_type.clone(),
            })
            .collect();

        let total_demand_mw = nodes
            .iter()
            .filter(|n| n.role == NodeRole::Substation)
            .map(|n| n.demand_mw)
            .sum();
        let average_risk = if edges.is_empty() {
            0.0
        } else {
            edges.iter().map(|e| e.risk).sum::<f64>() / edges.len() as f64
        };

        let metrics = GridMetrics {
            total_demand_mw,
            total_nodes: nodes.len(),
            total_edges: edges.len(),
            average_risk,
            generators: nodes
                .iter()
                .filter(|n| n.role == NodeRole::Generator)
                .count(),
        };

        Self {
            iteration,
            timestamp,
            nodes,
            edges,
            metrics,
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeState> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Static fields + live attributes + per-line neighbor detail for
    /// one node, or None if the id is unknown.
    pub fn node_detail(&self, id: NodeId) -> Option<NodeDetail> {
        let node = self.node(id)?;
        let neighbor_details = self
            .edges
            .iter()
            .filter_map(|e| {
                let (neighbor, name) = if e.source == id {
                    (e.target, e.target_name.clone())
                } else if e.target == id {
                    (e.source, e.source_name.clone())
                } else {
                    return None;
                };
                Some(NeighborDetail {
                    node_id: neighbor,
                    name,
                    resistance_ohm: e.resistance_ohm,
                    current_a: e.current_a,
                    temperature_c: e.temperature_c,
                    risk: e.risk,
                    power_flow_mw: e.power_flow_mw,
                })
            })
            .collect();

        Some(NodeDetail {
            id,
            name: node.name.clone(),
            role: node.role,
            demand_mw: node.demand_mw,
            voltage_kv: node.voltage_kv,
            neighbors: node.degree,
            neighbor_details,
        })
    }

    /// Per-node and per-line risk ranking, highest first.
    pub fn risk_report(&self) -> RiskReport {
        let mut nodes: Vec<NodeRisk> = self
            .nodes
            .iter()
            .map(|n| {
                let neighbor_risks: Vec<f64> = self
                    .edges
                    .iter()
                    .filter(|e| e.source == n.id || e.target == n.id)
                    .map(|e| e.risk)
                    .collect();
                let (average, max) = if neighbor_risks.is_empty() {
                    (0.0, 0.0)
                } else {
                    (
                        neighbor_risks.iter().sum::<f64>() / neighbor_risks.len() as f64,
                        neighbor_risks.iter().cloned().fold(0.0, f64::max),
                    )
                };
                NodeRisk {
                    id: n.id,
                    name: n.name.clone(),
                    role: n.role,
                    average_neighbor_risk: average,
                    max_neighbor_risk: max,
                    neighbors: n.degree,
                }
            })
            .collect();
        nodes.sort_by(|a, b| {
            b.average_neighbor_risk
                .total_cmp(&a.average_neighbor_risk)
        });

        let mut edges: Vec<EdgeRisk> = self
            .edges
            .iter()
            .map(|e| EdgeRisk {
                source: e.source,
                target: e.target,
                source_name: e.source_name.clone(),
                target_name: e.target_name.clone(),
                risk: e.risk,
                risk_band: e.risk_band,
                temperature_c: e.temperature_c,
                current_a: e.current_a,
            })
            .collect();
        edges.sort_by(|a, b| b.risk.total_cmp(&a.risk));

        RiskReport { nodes, edges }
    }

    /// Descriptive statistics over the snapshot's live attributes.
    pub fn statistics(&self) -> GridStatistics {
        let voltages: Vec<f64> = self.nodes.iter().map(|n| n.voltage_kv).collect();
        let demands: Vec<f64> = self.nodes.iter().map(|n| n.demand_mw).collect();
        let risks: Vec<f64> = self.edges.iter().map(|e| e.risk).collect();
        let temperatures: Vec<f64> = self.edges.iter().map(|e| e.temperature_c).collect();
        let currents: Vec<f64> = self.edges.iter().map(|e| e.current_a).collect();
        let power_flows: Vec<f64> = self.edges.iter().map(|e| e.power_flow_mw).collect();

        GridStatistics {
            iteration: self.iteration,
            voltage_kv: StatSummary::of(&voltages),
            demand_mw: StatSummary::of(&demands),
            risk: StatSummary::of(&risks),
            temperature_c: StatSummary::of(&temperatures),
            current_a: StatSummary::of(&currents),
            power_flow_mw: StatSummary::of(&power_flows),
            total_demand_mw: self.metrics.total_demand_mw,
            total_power_flow_mw: power_flows.iter().sum(),
            high_risk_edges: risks.iter().filter(|&&r| r > 0.5).count(),
        }
    }
}

/// One load node's chosen delivery path and its attributed loss.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizedPath {
    pub load_node: NodeId,
    pub load_name: String,
    /// None when no generator was reachable this tick.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator_node: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator_name: Option<String>,
    /// Node sequence from load to generator; empty when unrouted.
    pub path: Vec<NodeId>,
    pub demand_mw: f64,
    pub loss_mw: f64,
    pub routed: bool,
}

/// Per-tick optimization output, paired with one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    /// Matches the paired snapshot's iteration.
    pub iteration: u64,
    pub timestamp: DateTime<Utc>,
    pub paths: Vec<OptimizedPath>,
    /// Demand summed over routed substations only, MW.
    pub total_demand_mw: f64,
    pub total_loss_mw: f64,
    /// 100 * total_loss / total_demand, 0 when demand is 0.
    pub loss_percent: f64,
    /// Average risk over edges traversed by chosen paths, or over all
    /// edges when nothing was routed.
    pub avg_risk: f64,
    /// Negative loss percentage; higher is better.
    pub reward: f64,
}

/// Loss/risk trend data.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryReport {
    pub loss_history: Vec<f64>,
    pub risk_history: Vec<f64>,
    pub current_loss_percent: f64,
    pub current_avg_risk: f64,
    pub best_loss_percent: f64,
    pub worst_loss_percent: f64,
}

impl HistoryReport {
    pub fn new(loss_history: Vec<f64>, risk_history: Vec<f64>) -> Self {
        let (best, worst) = match loss_history.iter().cloned().minmax() {
            itertools::MinMaxResult::NoElements => (0.0, 0.0),
            itertools::MinMaxResult::OneElement(x) => (x, x),
            itertools::MinMaxResult::MinMax(min, max) => (min, max),
        };
        Self {
            current_loss_percent: loss_history.last().copied().unwrap_or(0.0),
            current_avg_risk: risk_history.last().copied().unwrap_or(0.0),
            best_loss_percent: best,
            worst_loss_percent: worst,
            loss_history,
            risk_history,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeDetail {
    pub id: NodeId,
    pub name: String,
    #[serde(rename = "type")]
    pub role: NodeRole,
    pub demand_mw: f64,
    pub voltage_kv: f64,
    pub neighbors: usize,
    pub neighbor_details: Vec<NeighborDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NeighborDetail {
    pub node_id: NodeId,
    pub name: String,
    pub resistance_ohm: f64,
    pub current_a: f64,
    pub temperature_c: f64,
    pub risk: f64,
    pub power_flow_mw: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskReport {
    pub nodes: Vec<NodeRisk>,
    pub edges: Vec<EdgeRisk>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeRisk {
    pub id: NodeId,
    pub name: String,
    #[serde(rename = "type")]
    pub role: NodeRole,
    pub average_neighbor_risk: f64,
    pub max_neighbor_risk: f64,
    pub neighbors: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeRisk {
    pub source: NodeId,
    pub target: NodeId,
    pub source_name: String,
    pub target_name: String,
    pub risk: f64,
    pub risk_band: RiskBand,
    pub temperature_c: f64,
    pub current_a: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GridStatistics {
    pub iteration: u64,
    pub voltage_kv: StatSummary,
    pub demand_mw: StatSummary,
    pub risk: StatSummary,
    pub temperature_c: StatSummary,
    pub current_a: StatSummary,
    pub power_flow_mw: StatSummary,
    pub total_demand_mw: f64,
    pub total_power_flow_mw: f64,
    pub high_risk_edges: usize,
}

/// Mean/min/max over one attribute series.
#[derive(Debug, Clone, Serialize)]
pub struct StatSummary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl StatSummary {
    pub fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                mean: 0.0,
                min: 0.0,
                max: 0.0,
            };
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        match values.iter().cloned().minmax() {
            itertools::MinMaxResult::MinMax(min, max) => Self { mean, min, max },
            itertools::MinMaxResult::OneElement(x) => Self { mean, min: x, max: x },
            itertools::MinMaxResult::NoElements => unreachable!(),
        }
    }
}
