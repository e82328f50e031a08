//! Entry point for the lightpost agent: serves the framed metric endpoint
//! and the JSON command endpoint until the process is stopped.

use anyhow::Context;
use lightpost_agent::{collect, commands, config, metric_server};
use std::env;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = env::args().nth(1).unwrap_or_else(|| "agent.toml".to_string());
    let cfg = config::load(&path).with_context(|| format!("loading config from {path}"))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(
        service = %cfg.labels.service,
        environment = %cfg.labels.environment,
        "starting agent"
    );

    let collector = collect::Collector::new();

    let metric_listener = TcpListener::bind(("0.0.0.0", cfg.server.metric_port))
        .await
        .with_context(|| format!("binding metric port {}", cfg.server.metric_port))?;
    let command_listener = TcpListener::bind(("0.0.0.0", cfg.server.command_port))
        .await
        .with_context(|| format!("binding command port {}", cfg.server.command_port))?;

    tokio::try_join!(
        metric_server::serve(metric_listener, collector.clone()),
        commands::serve(command_listener, collector),
    )?;
    Ok(())
}
