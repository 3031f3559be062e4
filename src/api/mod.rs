pub mod error;
pub mod grid;
pub mod health;
pub mod optimize;

use axum::{routing::get, routing::post, Router};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{config::Config, engine::GridEngine};

/// Shared handler state: the engine handle plus the bits of config
/// the handlers report back to clients.
#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<GridEngine>,
    pub tick_seconds: u64,
}

pub fn router(state: ApiState, cfg: &Config) -> Router {
    let mut router = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/grid/state", get(grid::get_grid_state))
        .route("/api/grid/optimize", post(optimize::optimize_grid))
        .route("/api/grid/paths", get(grid::get_optimized_paths))
        .route("/api/grid/loss", get(grid::get_loss_metrics))
        .route("/api/grid/risk", get(grid::get_risk_analysis))
        .route("/api/grid/statistics", get(grid::get_grid_statistics))
        .route("/api/grid/node/:id", get(grid::get_node_details))
        .with_state(state);

    if cfg.server.enable_cors {
        use tower_http::cors::CorsLayer;
        let cors = CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
            .allow_headers([axum::http::header::CONTENT_TYPE]);
        router = router.layer(cors);
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    cfg.server.request_timeout_secs,
                ))),
        )
        .layer(TraceLayer::new_for_http())
}
