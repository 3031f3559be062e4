pub mod api;
pub mod config;
pub mod engine;
pub mod optimizer;
pub mod risk;
pub mod simulation;
pub mod snapshot;
pub mod telemetry;
pub mod topology;
