//! Manual optimization trigger.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::{error::ApiError, ApiState};
use crate::snapshot::OptimizationResult;

#[derive(Debug, Serialize)]
pub struct OptimizeResponse {
    pub success: bool,
    pub result: Arc<OptimizationResult>,
    pub timestamp: DateTime<Utc>,
}

/// Run one orchestrator tick synchronously. Serialized with the
/// background loop, so at most one tick executes at a time.
pub async fn optimize_grid(
    State(st): State<ApiState>,
) -> Result<Json<OptimizeResponse>, ApiError> {
    let result = st.engine.trigger_optimization().await?;
    Ok(Json(OptimizeResponse {
        success: true,
        result,
        timestamp: Utc::now(),
    }))
}
