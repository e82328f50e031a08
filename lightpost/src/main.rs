//! Entry point for the lightpost aggregator: one poller task per configured
//! device plus the command dispatcher, all stopped together on Ctrl-C.

use anyhow::Context;
use lightpost::{config, dispatch, ingest, poller};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let cfg = config::Config::load(&path).with_context(|| format!("loading config from {path}"))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(
        service = %cfg.labels.service,
        environment = %cfg.labels.environment,
        "starting aggregator"
    );

    let ingest = Arc::new(
        ingest::IngestClient::new(
            &cfg.web_api.base_url,
            Duration::from_secs(cfg.web_api.timeout),
        )
        .context("building ingestion client")?,
    );

    let retry_interval = Duration::from_secs(cfg.telemetry.retry_interval);
    let read_timeout = Duration::from_secs(cfg.telemetry.read_timeout);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut tasks = Vec::new();
    for target in cfg.targets() {
        tracing::info!(host = %target.addr(), frequency = ?target.frequency, "starting poller");
        let host_poller = poller::Poller::new(
            target,
            Arc::clone(&ingest),
            retry_interval,
            read_timeout,
        );
        tasks.push(tokio::spawn(
            host_poller.run(poller::TcpDialer, shutdown_rx.clone()),
        ));
    }

    let dispatcher = dispatch::CommandDispatcher::new(
        cfg.targets(),
        Arc::clone(&ingest),
        Duration::from_secs(cfg.commands.interval),
        read_timeout,
    );
    tasks.push(tokio::spawn(dispatcher.run(shutdown_rx)));

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    let _ = shutdown_tx.send(true);
    for task in tasks {
        let _ = task.await;
    }
    Ok(())
}
