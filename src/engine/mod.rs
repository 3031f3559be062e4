//! # Grid Engine
//!
//! Owns the live topology and sequences one full update cycle per
//! tick: generate attributes, score risks, route every substation,
//! aggregate. The finished `(GridSnapshot, OptimizationResult)` pair
//! is swapped into a shared slot as a unit; readers only ever see a
//! fully-formed pair and never block a tick longer than the swap.
//!
//! The mutable simulation state sits behind its own mutex, so a manual
//! "optimize now" request and the scheduled background tick serialize
//! through the same path. A failed tick is logged and the previously
//! published pair stays visible.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::optimizer::{PathOptimizer, RouteOutcome};
use crate::risk::{HeuristicMaintenanceModel, RiskFeatures, RiskModel, RiskOracle};
use crate::simulation::{ScadaConfig, ScadaGenerator};
use crate::snapshot::{
    GridSnapshot, HistoryReport, NodeDetail, OptimizationResult, OptimizedPath,
};
use crate::topology::{EdgeKey, NodeId, Topology, TopologyError};

/// Outcome of a node-detail query. `NotReady` and `NotFound` are
/// conditions the caller must distinguish, not errors.
#[derive(Debug)]
pub enum NodeQuery {
    Ready(NodeDetail),
    NotFound,
    NotReady,
}

struct SimState {
    topology: Topology,
    scada: ScadaGenerator,
    oracle: RiskOracle,
    iteration: u64,
}

#[derive(Default)]
struct Published {
    current: Option<(Arc<GridSnapshot>, Arc<OptimizationResult>)>,
    loss_history: Vec<f64>,
    risk_history: Vec<f64>,
}

/// The live grid state engine. Construct once, share via `Arc`.
pub struct GridEngine {
    sim: Mutex<SimState>,
    published: RwLock<Published>,
    optimizer: PathOptimizer,
    history_limit: usize,
}

impl GridEngine {
    /// Build the engine from configuration. Fails with
    /// [`TopologyError`] if a connected grid cannot be constructed
    /// within the retry budget; fatal at startup.
    pub fn new(cfg: &Config) -> Result<Self, TopologyError> {
        Self::with_model(cfg, Box::new(HeuristicMaintenanceModel::default()))
    }

    /// Build with a specific risk-scoring collaborator.
    pub fn with_model(cfg: &Config, model: Box<dyn RiskModel>) -> Result<Self, TopologyError> {
        use rand::SeedableRng;
        let mut rng = match cfg.engine.random_seed {
            Some(seed) => rand::rngs::StdRng::seed_from_u64(seed),
            None => rand::rngs::StdRng::from_entropy(),
        };
        let topology = Topology::build(&cfg.topology, &mut rng)?;
        let scada = ScadaGenerator::new(ScadaConfig {
            random_seed: cfg.engine.random_seed,
            ..Default::default()
        });
        Ok(Self::from_parts(topology, scada, model, cfg))
    }

    /// Assemble from an explicit topology. Used for deterministic
    /// layouts and fixtures; no connectivity requirement.
    pub fn from_parts(
        topology: Topology,
        scada: ScadaGenerator,
        model: Box<dyn RiskModel>,
        cfg: &Config,
    ) -> Self {
        Self {
            sim: Mutex::new(SimState {
                topology,
                scada,
                oracle: RiskOracle::new(model),
                iteration: 0,
            }),
            published: RwLock::new(Published::default()),
            optimizer: PathOptimizer::new(cfg.engine.risk_weight),
            history_limit: cfg.engine.history_limit,
        }
    }

    /// Run one full tick and publish its outputs atomically.
    pub async fn tick(&self) -> anyhow::Result<(Arc<GridSnapshot>, Arc<OptimizationResult>)> {
        // All heavy work happens under the sim lock, which readers
        // never take; the published slot is only locked for the swap.
        let (snapshot, result) = {
            let mut sim = self.sim.lock().await;
            sim.run_tick(&self.optimizer)?
        };

        let snapshot = Arc::new(snapshot);
        let result = Arc::new(result);
        {
            let mut published = self.published.write().await;
            published.current = Some((snapshot.clone(), result.clone()));
            push_bounded(
                &mut published.loss_history,
                result.loss_percent,
                self.history_limit,
            );
            push_bounded(
                &mut published.risk_history,
                result.avg_risk,
                self.history_limit,
            );
        }
        Ok((snapshot, result))
    }

    /// Run one tick synchronously, serialized with the background loop.
    pub async fn trigger_optimization(&self) -> anyhow::Result<Arc<OptimizationResult>> {
        let (_, result) = self.tick().await?;
        Ok(result)
    }

    /// Last published snapshot, or None before the first tick.
    pub async fn current_snapshot(&self) -> Option<Arc<GridSnapshot>> {
        self.published
            .read()
            .await
            .current
            .as_ref()
            .map(|(s, _)| s.clone())
    }

    /// Last published optimization result, or None before the first tick.
    pub async fn current_optimization(&self) -> Option<Arc<OptimizationResult>> {
        self.published
            .read()
            .await
            .current
            .as_ref()
            .map(|(_, r)| r.clone())
    }

    /// Both halves of the published pair, guaranteed from the same tick.
    pub async fn current_pair(
        &self,
    ) -> Option<(Arc<GridSnapshot>, Arc<OptimizationResult>)> {
        self.published.read().await.current.clone()
    }

    pub async fn history(&self) -> HistoryReport {
        let published = self.published.read().await;
        HistoryReport::new(
            published.loss_history.clone(),
            published.risk_history.clone(),
        )
    }

    pub async fn node_detail(&self, id: NodeId) -> NodeQuery {
        match self.current_snapshot().await {
            None => NodeQuery::NotReady,
            Some(snapshot) => match snapshot.node_detail(id) {
                Some(detail) => NodeQuery::Ready(detail),
                None => NodeQuery::NotFound,
            },
        }
    }
}

impl SimState {
    fn run_tick(
        &mut self,
        optimizer: &PathOptimizer,
    ) -> anyhow::Result<(GridSnapshot, OptimizationResult)> {
        if self.topology.nodes().is_empty() {
            anyhow::bail!("topology has no nodes");
        }
        self.iteration += 1;

        // Phase 1: generate
        self.scada.advance(&mut self.topology);

        // Phase 2a: score every line with the latest model output.
        // The previous tick's risk is the fallback if the oracle fails.
        let assessments: Vec<(f64, Option<String>)> = self
            .topology
            .edges()
            .iter()
            .map(|edge| {
                match (
                    self.topology.node(edge.key.a),
                    self.topology.node(edge.key.b),
                ) {
                    (Some(a), Some(b)) => {
                        let features = RiskFeatures::from_edge(edge, a, b);
                        let assessment = self.oracle.assess(&features, Some(edge.risk));
                        (assessment.probability, assessment.failure_type)
                    }
                    _ => (edge.risk, edge.failure_type.clone()),
                }
            })
            .collect();
        for (edge, (risk, failure_type)) in
            self.topology.edges_mut().iter_mut().zip(assessments)
        {
            edge.risk = risk;
            edge.failure_type = failure_type;
        }

        // Phase 2b: route every substation to its cheapest generator
        let mut paths = Vec::new();
        let mut traversed: HashSet<EdgeKey> = HashSet::new();
        let mut total_demand_mw = 0.0;
        let mut total_loss_mw = 0.0;

        for load in self.topology.substation_ids() {
            let node = match self.topology.node(load) {
                Some(n) => n.clone(),
                None => continue,
            };
            match optimizer.route(&self.topology, load) {
                RouteOutcome::Found(route) => {
                    let loss_mw =
                        PathOptimizer::path_loss_mw(node.current_demand_mw, route.resistance_ohm);
                    total_demand_mw += node.current_demand_mw;
                    total_loss_mw += loss_mw;
                    for hop in route.path.windows(2) {
                        traversed.insert(EdgeKey::new(hop[0], hop[1]));
                    }
                    paths.push(OptimizedPath {
                        load_node: load,
                        load_name: node.name,
                        generator_node: Some(route.generator),
                        generator_name: self
                            .topology
                            .node(route.generator)
                            .map(|g| g.name.clone()),
                        path: route.path,
                        demand_mw: node.current_demand_mw,
                        loss_mw,
                        routed: true,
                    });
                }
                RouteOutcome::NoRoute => {
                    // Zero contribution; the substation stays visible
                    // in the result so readers can see it was skipped.
                    warn!(load_node = load, role = %node.role, "no route to any generator");
                    paths.push(OptimizedPath {
                        load_node: load,
                        load_name: node.name,
                        generator_node: None,
                        generator_name: None,
                        path: Vec::new(),
                        demand_mw: node.current_demand_mw,
                        loss_mw: 0.0,
                        routed: false,
                    });
                }
            }
        }

        // Phase 3: aggregate
        let loss_percent = loss_percent(total_loss_mw, total_demand_mw);
        let avg_risk = self.average_traversed_risk(&traversed);
        let timestamp = Utc::now();

        let snapshot = GridSnapshot::capture(&self.topology, self.iteration, timestamp);
        let result = OptimizationResult {
            iteration: self.iteration,
            timestamp,
            paths,
            total_demand_mw,
            total_loss_mw,
            loss_percent,
            avg_risk,
            reward: -loss_percent,
        };
        Ok((snapshot, result))
    }

    /// Average risk over traversed edges, falling back to all edges
    /// when no path was found this tick.
    fn average_traversed_risk(&self, traversed: &HashSet<EdgeKey>) -> f64 {
        let risks: Vec<f64> = if traversed.is_empty() {
            self.topology.edges().iter().map(|e| e.risk).collect()
        } else {
            traversed
                .iter()
                .filter_map(|k| self.topology.edge_between(k.a, k.b))
                .map(|e| e.risk)
                .collect()
        };
        if risks.is_empty() {
            0.0
        } else {
            risks.iter().sum::<f64>() / risks.len() as f64
        }
    }
}

fn loss_percent(total_loss_mw: f64, total_demand_mw: f64) -> f64 {
    if total_demand_mw > 0.0 {
        (total_loss_mw / total_demand_mw) * 100.0
    } else {
        0.0
    }
}

fn push_bounded(history: &mut Vec<f64>, value: f64, limit: usize) {
    if limit > 0 && history.len() >= limit {
        history.remove(0);
    }
    history.push(value);
}

/// Run the orchestrator on a fixed cadence in a dedicated task. Tick
/// failures are logged and retried on the next interval; the previous
/// snapshot stays published in the meantime.
pub fn spawn_background_tick(engine: Arc<GridEngine>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            match engine.tick().await {
                Ok((snapshot, result)) => {
                    if snapshot.iteration % 10 == 0 {
                        info!(
                            iteration = snapshot.iteration,
                            total_demand_mw = result.total_demand_mw,
                            loss_percent = result.loss_percent,
                            avg_risk = result.avg_risk,
                            "tick published"
                        );
                    }
                }
                Err(e) => {
                    warn!(error = %e, "tick failed, previous snapshot remains published");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_loss_percent_zero_demand() {
        assert_eq!(loss_percent(5.0, 0.0), 0.0);
        assert!((loss_percent(5.0, 50.0) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_push_bounded_caps_length() {
        let mut history = Vec::new();
        for i in 0..10 {
            push_bounded(&mut history, i as f64, 4);
        }
        assert_eq!(history, vec![6.0, 7.0, 8.0, 9.0]);
    }

    #[tokio::test]
    async fn test_not_ready_before_first_tick() {
        let cfg = Config::for_tests(42);
        let engine = GridEngine::new(&cfg).unwrap();

        assert!(engine.current_snapshot().await.is_none());
        assert!(engine.current_optimization().await.is_none());
        assert!(matches!(engine.node_detail(2).await, NodeQuery::NotReady));

        engine.tick().await.unwrap();
        assert!(engine.current_snapshot().await.is_some());
        assert!(matches!(engine.node_detail(2).await, NodeQuery::Ready(_)));
        assert!(matches!(engine.node_detail(99).await, NodeQuery::NotFound));
    }

    #[tokio::test]
    async fn test_histories_append_per_tick() {
        let cfg = Config::for_tests(42);
        let engine = GridEngine::new(&cfg).unwrap();
        for _ in 0..3 {
            engine.tick().await.unwrap();
        }
        let history = engine.history().await;
        assert_eq!(history.loss_history.len(), 3);
        assert_eq!(history.risk_history.len(), 3);
        assert_eq!(
            history.current_loss_percent,
            *history.loss_history.last().unwrap()
        );
    }
}
