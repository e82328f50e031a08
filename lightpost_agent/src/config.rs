//! TOML configuration for the agent.

use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub labels: Labels,
    pub logging: Logging,
    pub server: Server,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Labels {
    pub environment: String,
    pub service: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Logging {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    /// Raw TCP listener answering one frame per connection.
    pub metric_port: u16,
    /// HTTP listener for `/cmd` and the HTTP flavor of `/metric`.
    pub command_port: u16,
}

pub fn load(path: &str) -> Result<Config> {
    let contents = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let cfg: Config = toml::from_str(&contents).context("parsing config")?;
    ensure!(
        !cfg.labels.environment.is_empty(),
        "labels.environment must not be empty"
    );
    ensure!(
        !cfg.labels.service.is_empty(),
        "labels.service must not be empty"
    );
    ensure!(
        !cfg.logging.level.is_empty(),
        "logging.level must not be empty"
    );
    ensure!(cfg.server.metric_port != 0, "server.metric_port must be set");
    ensure!(
        cfg.server.command_port != 0,
        "server.command_port must be set"
    );
    Ok(cfg)
}
