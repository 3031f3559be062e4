use anyhow::Result;
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;
use std::net::SocketAddr;

pub use crate::topology::TopologyConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub topology: TopologyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Background tick period in seconds.
    pub tick_seconds: u64,
    /// Cost-function weight on line risk relative to resistance.
    pub risk_weight: f64,
    /// Maximum retained loss/risk history entries.
    pub history_limit: usize,
    /// Seed for all stochastic models (None = entropy).
    pub random_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 3,
            risk_weight: 10.0,
            history_limit: 512,
            random_seed: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("GRID__").split("__"));
        Ok(figment.extract()?)
    }

    /// Deterministic configuration for tests: seeded, default roster.
    pub fn for_tests(seed: u64) -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 0,
                enable_cors: false,
                request_timeout_secs: 10,
            },
            engine: EngineConfig {
                random_seed: Some(seed),
                ..Default::default()
            },
            topology: TopologyConfig::default(),
        }
    }
}
