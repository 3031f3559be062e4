//! # Risk Oracle Adapter
//!
//! Translates live line attributes into the feature vector consumed by
//! the pluggable risk-scoring model and normalizes its output into a
//! bounded assessment. A failing or misbehaving model never stalls
//! routing: the adapter falls back to the edge's last-known risk.

pub mod model;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::topology::{Edge, Node};

pub use model::HeuristicMaintenanceModel;

/// Conservative prior used when no model output has ever been seen.
pub const FALLBACK_RISK: f64 = 0.5;

/// Fixed feature set assembled from live readings and the line's wear
/// profile.
#[derive(Debug, Clone, Serialize)]
pub struct RiskFeatures {
    pub temperature_c: f64,
    /// Averaged endpoint demand in MW.
    pub load_mw: f64,
    pub age_years: f64,
    pub vibration_mm_s: f64,
    pub corrosion_index: f64,
    pub harmonic_distortion_pct: f64,
}

impl RiskFeatures {
    /// Assemble the feature vector for one line from its endpoints.
    pub fn from_edge(edge: &Edge, a: &Node, b: &Node) -> Self {
        Self {
            temperature_c: edge.temperature_c,
            load_mw: (a.current_demand_mw + b.current_demand_mw) / 2.0,
            age_years: edge.wear.age_years,
            vibration_mm_s: edge.wear.vibration_mm_s,
            corrosion_index: edge.wear.corrosion_index,
            harmonic_distortion_pct: edge.wear.harmonic_distortion_pct,
        }
    }
}

/// Coarse qualitative classification of a failure probability.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RiskBand {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskBand {
    pub fn from_probability(p: f64) -> Self {
        if p > 0.7 {
            RiskBand::Critical
        } else if p > 0.4 {
            RiskBand::High
        } else if p > 0.2 {
            RiskBand::Medium
        } else {
            RiskBand::Low
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            RiskBand::Critical => "Immediate action required",
            RiskBand::High => "Schedule maintenance within 7 days",
            RiskBand::Medium => "Monitor closely",
            RiskBand::Low => "Normal operation",
        }
    }
}

/// Normalized scoring output for one line.
#[derive(Debug, Clone, Serialize)]
pub struct RiskAssessment {
    /// Failure probability in [0, 1].
    pub probability: f64,
    pub band: RiskBand,
    pub recommendation: &'static str,
    /// Predicted failure mode when the probability is elevated.
    pub failure_type: Option<String>,
}

/// The external scoring collaborator. Implementations may fail; the
/// adapter owns the fallback policy.
pub trait RiskModel: Send + Sync {
    /// Returns a failure-probability-like score for the feature vector.
    fn score(&self, features: &RiskFeatures) -> anyhow::Result<f64>;
}

/// Wraps a [`RiskModel`] with output normalization and fallback.
pub struct RiskOracle {
    model: Box<dyn RiskModel>,
}

impl RiskOracle {
    pub fn new(model: Box<dyn RiskModel>) -> Self {
        Self { model }
    }

    /// Score one line. `last_known` is the risk published for this line
    /// on a previous tick; it is reused when the model errors out or
    /// returns a non-finite value.
    pub fn assess(&self, features: &RiskFeatures, last_known: Option<f64>) -> RiskAssessment {
        let probability = match self.model.score(features) {
            Ok(p) if p.is_finite() => p.clamp(0.0, 1.0),
            Ok(p) => {
                debug!(score = p, "risk model returned non-finite score, using fallback");
                last_known.unwrap_or(FALLBACK_RISK)
            }
            Err(e) => {
                debug!(error = %e, "risk model unavailable, using fallback");
                last_known.unwrap_or(FALLBACK_RISK)
            }
        };

        let band = RiskBand::from_probability(probability);
        if band == RiskBand::Critical {
            debug!(band = %band, probability, "line scored critical");
        }
        RiskAssessment {
            probability,
            band,
            recommendation: band.recommendation(),
            failure_type: classify_failure(probability, features),
        }
    }
}

/// Failure-mode heuristic applied once the probability is elevated.
fn classify_failure(probability: f64, features: &RiskFeatures) -> Option<String> {
    if probability <= 0.3 {
        return None;
    }
    let failure_type = if features.temperature_c > 90.0 {
        "Thermal Overload"
    } else if features.vibration_mm_s > 1.0 {
        "Mechanical Fatigue"
    } else if features.harmonic_distortion_pct > 8.0 {
        "Electrical Disturbance"
    } else {
        "General Degradation"
    };
    Some(failure_type.to_string())
}
