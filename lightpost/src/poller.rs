//! Per-device polling loop: dial, request, read one frame, decode, forward.
//! One poller task per configured device, fully independent of the others.

use crate::config::HostTarget;
use crate::ingest::{ForwardError, IngestClient};
use lightpost_proto::frame::{self, FrameError, MAX_PAYLOAD};
use lightpost_proto::metrics::{parse_payload, DeviceMetrics};
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// A frame holds at most `MAX_PAYLOAD` (255) payload bytes, so 1024 bytes
/// always fits one frame plus any HTTP preamble. Keep that relationship if
/// either constant ever changes.
const READ_BUF: usize = 1024;
const _: () = assert!(READ_BUF >= MAX_PAYLOAD + 3);

pub const METRIC_REQUEST: &[u8] = b"GET /metric HTTP/1.0\r\n\r\n";

#[derive(Debug, Error)]
pub enum PollError {
    #[error("connection failed: {0}")]
    Connection(#[from] io::Error),
    #[error("device did not answer within the read deadline")]
    Deadline,
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Forward(#[from] ForwardError),
}

impl PollError {
    /// Dial/read failures reschedule at the retry interval; decode and
    /// forward failures just wait for the next regular tick.
    fn is_connection(&self) -> bool {
        matches!(self, PollError::Connection(_) | PollError::Deadline)
    }
}

/// Dialing is injectable so tests can script connection failures.
pub trait Dialer: Send + Sync + 'static {
    fn dial(&self, addr: &str) -> impl Future<Output = io::Result<TcpStream>> + Send;
}

pub struct TcpDialer;

impl Dialer for TcpDialer {
    fn dial(&self, addr: &str) -> impl Future<Output = io::Result<TcpStream>> + Send {
        let addr = addr.to_string();
        async move { TcpStream::connect(&addr).await }
    }
}

pub struct Poller {
    target: HostTarget,
    ingest: Arc<IngestClient>,
    retry_interval: Duration,
    read_timeout: Duration,
}

impl Poller {
    pub fn new(
        target: HostTarget,
        ingest: Arc<IngestClient>,
        retry_interval: Duration,
        read_timeout: Duration,
    ) -> Self {
        Self {
            target,
            ingest,
            retry_interval,
            read_timeout,
        }
    }

    /// Runs until the shutdown signal flips. No failure ends the loop: an
    /// unreachable device is retried at the retry interval indefinitely, and
    /// decode or forward failures drop that cycle's metrics and wait for the
    /// next tick.
    pub async fn run<D: Dialer>(self, dialer: D, mut shutdown: watch::Receiver<bool>) {
        let addr = self.target.addr();
        loop {
            let pause = match self.poll_once(&dialer).await {
                Ok(count) => {
                    debug!(host = %addr, metrics = count, "cycle complete");
                    self.target.frequency
                }
                Err(err) if err.is_connection() => {
                    warn!(host = %addr, %err, "device unreachable, will retry");
                    self.retry_interval
                }
                Err(err) => {
                    warn!(host = %addr, %err, "poll cycle failed");
                    self.target.frequency
                }
            };
            tokio::select! {
                _ = sleep(pause) => {}
                _ = shutdown.changed() => return,
            }
        }
    }

    /// One cycle: at-most-once delivery, with the next tick as the only
    /// retry mechanism.
    pub async fn poll_once<D: Dialer>(&self, dialer: &D) -> Result<usize, PollError> {
        let addr = self.target.addr();
        let mut stream = timeout(self.read_timeout, dialer.dial(&addr))
            .await
            .map_err(|_| PollError::Deadline)??;

        timeout(self.read_timeout, stream.write_all(METRIC_REQUEST))
            .await
            .map_err(|_| PollError::Deadline)??;

        // Single bounded read: one frame, optionally behind an HTTP preamble.
        let mut buf = [0u8; READ_BUF];
        let n = timeout(self.read_timeout, stream.read(&mut buf))
            .await
            .map_err(|_| PollError::Deadline)??;
        debug!(host = %addr, bytes = n, "response received");

        let payload = frame::decode(&buf[..n])?;
        let batch = DeviceMetrics {
            device: self.target.host.clone(),
            metrics: parse_payload(&payload),
        };
        let count = batch.metrics.len();
        self.ingest.forward_metrics(&batch).await?;
        Ok(count)
    }
}
