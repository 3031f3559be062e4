//! # SCADA Attribute Generation
//!
//! Advances all per-tick dynamic attributes using bounded stochastic
//! models. Edge attributes are written in dependency order: resistance,
//! then current (needs endpoint demand), then temperature (needs
//! current), then power flow (needs voltage and current). Risk is
//! deliberately not written here; the risk oracle scores edges during
//! routing so the cost function always sees the latest model output.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use crate::topology::Topology;

/// Bands for the stochastic attribute models.
#[derive(Debug, Clone, Deserialize)]
pub struct ScadaConfig {
    /// Bus voltage band in kV (220 kV nominal ±5%).
    pub voltage_min_kv: f64,
    pub voltage_max_kv: f64,
    /// Demand jitter around the baseline in MW.
    pub demand_jitter_mw: f64,
    /// Demand never drops below this fraction of the baseline.
    pub demand_floor_ratio: f64,
    /// Line resistance band in Ohms.
    pub resistance_min_ohm: f64,
    pub resistance_max_ohm: f64,
    /// Base line current band in Amperes.
    pub current_min_a: f64,
    pub current_max_a: f64,
    /// Additional Amperes per MW of connected demand.
    pub current_per_demand_mw: f64,
    /// Conductor temperature model: base + rise * current/reference ± jitter.
    pub temp_base_c: f64,
    pub temp_rise_c: f64,
    pub temp_reference_a: f64,
    pub temp_jitter_c: f64,
    /// Random seed for reproducibility (None = entropy).
    pub random_seed: Option<u64>,
}

impl Default for ScadaConfig {
    fn default() -> Self {
        Self {
            voltage_min_kv: 210.0,
            voltage_max_kv: 230.0,
            demand_jitter_mw: 2.0,
            demand_floor_ratio: 0.8,
            resistance_min_ohm: 0.001,
            resistance_max_ohm: 0.005,
            current_min_a: 100.0,
            current_max_a: 400.0,
            current_per_demand_mw: 2.0,
            temp_base_c: 25.0,
            temp_rise_c: 40.0,
            temp_reference_a: 400.0,
            temp_jitter_c: 2.0,
            random_seed: None,
        }
    }
}

/// Regenerates live node and edge attributes in place each tick.
pub struct ScadaGenerator {
    config: ScadaConfig,
    rng: StdRng,
}

impl ScadaGenerator {
    pub fn new(config: ScadaConfig) -> Self {
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    /// Advance all dynamic attributes by one generation. Structural
    /// fields are untouched.
    pub fn advance(&mut self, topology: &mut Topology) {
        let cfg = self.config.clone();

        for node in topology.nodes_mut() {
            node.voltage_kv = self.rng.gen_range(cfg.voltage_min_kv..cfg.voltage_max_kv);
            node.current_demand_mw = if node.is_substation() {
                let jitter = self
                    .rng
                    .gen_range(-cfg.demand_jitter_mw..cfg.demand_jitter_mw);
                let floor = node.baseline_demand_mw * cfg.demand_floor_ratio;
                (node.baseline_demand_mw + jitter).max(floor)
            } else {
                0.0
            };
        }

        // Snapshot demand and voltage before the edge pass; edges read
        // both endpoints and we cannot hold two node borrows.
        let demand: Vec<f64> = topology
            .nodes()
            .iter()
            .map(|n| n.current_demand_mw)
            .collect();
        let voltage: Vec<f64> = topology.nodes().iter().map(|n| n.voltage_kv).collect();

        for edge in topology.edges_mut() {
            edge.resistance_ohm = self
                .rng
                .gen_range(cfg.resistance_min_ohm..cfg.resistance_max_ohm);

            let connected_demand = demand[edge.key.a] + demand[edge.key.b];
            edge.current_a = self.rng.gen_range(cfg.current_min_a..cfg.current_max_a)
                + connected_demand * cfg.current_per_demand_mw;

            edge.temperature_c = cfg.temp_base_c
                + (edge.current_a / cfg.temp_reference_a) * cfg.temp_rise_c
                + self.rng.gen_range(-cfg.temp_jitter_c..cfg.temp_jitter_c);

            let avg_voltage_kv = (voltage[edge.key.a] + voltage[edge.key.b]) / 2.0;
            edge.power_flow_mw = avg_voltage_kv * edge.current_a / 1000.0;
        }
    }
}
