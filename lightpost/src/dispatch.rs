//! Command dispatcher: a single ticking loop that fans pending commands out
//! to devices over pseudo-HTTP and reports a terminal status per attempt.
//! Stateless between ticks; pending work is re-fetched from the ingestion
//! service every cycle.

use crate::config::HostTarget;
use crate::ingest::{CommandStatus, IngestClient};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{interval_at, timeout, Instant};
use tracing::{debug, warn};

const READ_BUF: usize = 1024;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("device connection failed: {0}")]
    Connection(#[from] io::Error),
    #[error("device did not answer within the read deadline")]
    Deadline,
    #[error("device rejected command: {0}")]
    Rejected(String),
}

/// Success is strictly a 200 OK status line from either HTTP version.
pub fn response_ok(response: &str) -> bool {
    response.starts_with("HTTP/1.0 200 OK") || response.starts_with("HTTP/1.1 200 OK")
}

pub struct CommandDispatcher {
    targets: Vec<HostTarget>,
    ingest: Arc<IngestClient>,
    tick: Duration,
    read_timeout: Duration,
}

impl CommandDispatcher {
    pub fn new(
        targets: Vec<HostTarget>,
        ingest: Arc<IngestClient>,
        tick: Duration,
        read_timeout: Duration,
    ) -> Self {
        Self {
            targets,
            ingest,
            tick,
            read_timeout,
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        // First pass runs one full interval after startup, not immediately.
        let mut ticker = interval_at(Instant::now() + self.tick, self.tick);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick_once().await,
                _ = shutdown.changed() => return,
            }
        }
    }

    /// One pass over every configured device, in configuration order. A
    /// listing failure skips that device until the next tick; each delivered
    /// command gets exactly one status report.
    pub async fn tick_once(&self) {
        for target in &self.targets {
            let device = target.addr();
            let pending = match self.ingest.pending_commands(&device).await {
                Ok(pending) => pending,
                Err(err) => {
                    warn!(%device, %err, "command listing failed");
                    continue;
                }
            };

            for cmd in pending.iter().filter(|c| c.device == device) {
                if cmd.command.is_empty() {
                    warn!(%device, "skipping command with empty name");
                    continue;
                }
                let status = match self.deliver(&device, &cmd.command).await {
                    Ok(()) => {
                        debug!(%device, command = %cmd.command, "command delivered");
                        CommandStatus::Completed
                    }
                    Err(err) => {
                        warn!(%device, command = %cmd.command, %err, "delivery failed");
                        CommandStatus::Failed
                    }
                };
                if let Err(err) = self
                    .ingest
                    .update_command_status(&device, &cmd.command, status)
                    .await
                {
                    warn!(%device, command = %cmd.command, %err, "status report failed");
                }
            }
        }
    }

    /// Deliver one command over a fresh connection as a pseudo-HTTP POST and
    /// judge the reply by its status line alone.
    async fn deliver(&self, addr: &str, command: &str) -> Result<(), DeliveryError> {
        let body = serde_json::json!({ "command": command }).to_string();
        let request = format!(
            "POST /cmd HTTP/1.0\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );

        let mut stream = timeout(self.read_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| DeliveryError::Deadline)??;
        timeout(self.read_timeout, stream.write_all(request.as_bytes()))
            .await
            .map_err(|_| DeliveryError::Deadline)??;

        let mut buf = [0u8; READ_BUF];
        let n = timeout(self.read_timeout, stream.read(&mut buf))
            .await
            .map_err(|_| DeliveryError::Deadline)??;

        let response = String::from_utf8_lossy(&buf[..n]);
        if response_ok(&response) {
            Ok(())
        } else {
            let status_line = response.lines().next().unwrap_or_default().to_string();
            Err(DeliveryError::Rejected(status_line))
        }
    }
}
