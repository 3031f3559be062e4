//! Grid state query endpoints, all reading the last published pair.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::{error::ApiError, ApiState};
use crate::engine::NodeQuery;
use crate::snapshot::{
    GridMetrics, GridSnapshot, GridStatistics, HistoryReport, NodeDetail, OptimizationResult,
    RiskReport,
};
use crate::topology::NodeId;

#[derive(Debug, Serialize)]
pub struct GridStateResponse {
    #[serde(flatten)]
    pub snapshot: Arc<GridSnapshot>,
    pub optimization: Arc<OptimizationResult>,
}

/// Current grid state with node, edge and optimization data.
pub async fn get_grid_state(
    State(st): State<ApiState>,
) -> Result<Json<GridStateResponse>, ApiError> {
    let (snapshot, optimization) = st
        .engine
        .current_pair()
        .await
        .ok_or(ApiError::Initializing)?;
    Ok(Json(GridStateResponse {
        snapshot,
        optimization,
    }))
}

/// Current optimized delivery paths from the latest tick.
pub async fn get_optimized_paths(
    State(st): State<ApiState>,
) -> Result<Json<Arc<OptimizationResult>>, ApiError> {
    let optimization = st
        .engine
        .current_optimization()
        .await
        .ok_or(ApiError::Initializing)?;
    Ok(Json(optimization))
}

/// Transmission loss and risk history.
pub async fn get_loss_metrics(State(st): State<ApiState>) -> Json<HistoryReport> {
    Json(st.engine.history().await)
}

#[derive(Debug, Serialize)]
pub struct RiskResponse {
    #[serde(flatten)]
    pub report: RiskReport,
    pub timestamp: DateTime<Utc>,
}

/// Risk ranking for all assets, highest first.
pub async fn get_risk_analysis(
    State(st): State<ApiState>,
) -> Result<Json<RiskResponse>, ApiError> {
    let snapshot = st
        .engine
        .current_snapshot()
        .await
        .ok_or(ApiError::Initializing)?;
    Ok(Json(RiskResponse {
        report: snapshot.risk_report(),
        timestamp: Utc::now(),
    }))
}

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    #[serde(flatten)]
    pub statistics: GridStatistics,
    pub metrics: GridMetrics,
    pub timestamp: DateTime<Utc>,
}

/// Descriptive statistics over the current snapshot.
pub async fn get_grid_statistics(
    State(st): State<ApiState>,
) -> Result<Json<StatisticsResponse>, ApiError> {
    let snapshot = st
        .engine
        .current_snapshot()
        .await
        .ok_or(ApiError::Initializing)?;
    Ok(Json(StatisticsResponse {
        statistics: snapshot.statistics(),
        metrics: snapshot.metrics.clone(),
        timestamp: Utc::now(),
    }))
}

/// Detailed information about a specific node.
pub async fn get_node_details(
    State(st): State<ApiState>,
    Path(id): Path<NodeId>,
) -> Result<Json<NodeDetail>, ApiError> {
    match st.engine.node_detail(id).await {
        NodeQuery::Ready(detail) => Ok(Json(detail)),
        NodeQuery::NotFound => Err(ApiError::NotFound(format!("Node {id} not found"))),
        NodeQuery::NotReady => Err(ApiError::Initializing),
    }
}
