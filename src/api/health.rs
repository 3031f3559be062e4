//! Health check endpoint

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ApiState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub grid_state: &'static str,
    pub tick_seconds: u64,
}

pub async fn health_check(State(st): State<ApiState>) -> Json<HealthResponse> {
    let grid_state = if st.engine.current_snapshot().await.is_some() {
        "initialized"
    } else {
        "initializing"
    };
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        grid_state,
        tick_seconds: st.tick_seconds,
    })
}
