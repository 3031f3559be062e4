//! Built-in heuristic maintenance model.
//!
//! Stands in for the trained classifier ensemble in deployments where
//! no model artifact is available. Weighted blend of load, thermal and
//! wear factors, capped below certainty.

use serde::Deserialize;

use super::{RiskFeatures, RiskModel};

#[derive(Debug, Clone, Deserialize)]
pub struct HeuristicWeights {
    pub load: f64,
    pub temperature: f64,
    pub age: f64,
    pub vibration: f64,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self {
            load: 0.3,
            temperature: 0.4,
            age: 0.2,
            vibration: 0.1,
        }
    }
}

pub struct HeuristicMaintenanceModel {
    weights: HeuristicWeights,
    /// Upper cap on the emitted probability.
    cap: f64,
}

impl HeuristicMaintenanceModel {
    pub fn new(weights: HeuristicWeights) -> Self {
        Self {
            weights,
            cap: 0.95,
        }
    }
}

impl Default for HeuristicMaintenanceModel {
    fn default() -> Self {
        Self::new(HeuristicWeights::default())
    }
}

impl RiskModel for HeuristicMaintenanceModel {
    fn score(&self, features: &RiskFeatures) -> anyhow::Result<f64> {
        let w = &self.weights;
        let raw = w.load * (features.load_mw / 100.0)
            + w.temperature * (features.temperature_c / 100.0)
            + w.age * (features.age_years / 20.0)
            + w.vibration * features.vibration_mm_s;
        Ok(raw.clamp(0.0, self.cap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cold_idle_line_scores_low() {
        let model = HeuristicMaintenanceModel::default();
        let features = RiskFeatures {
            temperature_c: 25.0,
            load_mw: 0.0,
            age_years: 1.0,
            vibration_mm_s: 0.0,
            corrosion_index: 0.0,
            harmonic_distortion_pct: 1.0,
        };
        let score = model.score(&features).unwrap();
        assert!(score < 0.2, "got {score}");
    }

    #[test]
    fn test_worn_hot_line_is_capped() {
        let model = HeuristicMaintenanceModel::default();
        let features = RiskFeatures {
            temperature_c: 200.0,
            load_mw: 300.0,
            age_years: 40.0,
            vibration_mm_s: 2.5,
            corrosion_index: 0.9,
            harmonic_distortion_pct: 12.0,
        };
        assert_eq!(model.score(&features).unwrap(), 0.95);
    }

    proptest! {
        #[test]
        fn prop_score_bounded(
            temperature_c in 0.0..150.0f64,
            load_mw in 0.0..200.0f64,
            age_years in 0.0..30.0f64,
            vibration_mm_s in 0.0..2.0f64,
        ) {
            let model = HeuristicMaintenanceModel::default();
            let features = RiskFeatures {
                temperature_c,
                load_mw,
                age_years,
                vibration_mm_s,
                corrosion_index: 0.2,
                harmonic_distortion_pct: 3.0,
            };
            let score = model.score(&features).unwrap();
            prop_assert!((0.0..=0.95).contains(&score));
        }
    }
}
