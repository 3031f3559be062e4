use anyhow::Result;
use axum::Router;
use smart_grid_engine::{api, config, engine, telemetry};
use config::Config;
use engine::GridEngine;
use std::sync::Arc;
use std::time::Duration;
use telemetry::init_tracing;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;

    let engine = Arc::new(GridEngine::new(&cfg)?);
    let state = api::ApiState {
        engine: engine.clone(),
        tick_seconds: cfg.engine.tick_seconds,
    };
    let app: Router = api::router(state, &cfg);

    engine::spawn_background_tick(
        engine,
        Duration::from_secs(cfg.engine.tick_seconds.max(1)),
    );

    let addr = cfg.server.socket_addr()?;

    if cfg.server.host == "0.0.0.0" {
        warn!(
            "Server binding to 0.0.0.0 - service will be accessible from network! \
            For production, bind to 127.0.0.1 unless behind a firewall/reverse proxy."
        );
    }

    info!(%addr, "starting smart grid engine");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}
