//! HTTP client for the ingestion service. One client instance is shared by
//! every poller and the dispatcher; reqwest's `Client` is safe for
//! concurrent use.

use lightpost_proto::metrics::DeviceMetrics;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("ingestion request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("ingestion returned status {0}")]
    Status(reqwest::StatusCode),
}

/// A command the ingestion service wants delivered to a device.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PendingCommand {
    pub device: String,
    pub command: String,
}

/// Terminal delivery states, reported exactly once per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Completed,
    Failed,
}

#[derive(Debug, Serialize)]
struct StatusUpdate<'a> {
    device: &'a str,
    command: &'a str,
    status: CommandStatus,
}

pub struct IngestClient {
    http: reqwest::Client,
    base_url: String,
}

impl IngestClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `POST {base}/metric` with the device identity in `X-DeviceID`.
    pub async fn forward_metrics(&self, batch: &DeviceMetrics) -> Result<(), ForwardError> {
        let resp = self
            .http
            .post(format!("{}/metric", self.base_url))
            .header("X-DeviceID", &batch.device)
            .json(batch)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ForwardError::Status(resp.status()));
        }
        Ok(())
    }

    /// `GET {base}/api/command` for one device, tagged `host:port`.
    pub async fn pending_commands(
        &self,
        device: &str,
    ) -> Result<Vec<PendingCommand>, ForwardError> {
        let resp = self
            .http
            .get(format!("{}/api/command", self.base_url))
            .header("X-DeviceID", device)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ForwardError::Status(resp.status()));
        }
        Ok(resp.json().await?)
    }

    /// `POST {base}/api/command/status` after a delivery attempt.
    pub async fn update_command_status(
        &self,
        device: &str,
        command: &str,
        status: CommandStatus,
    ) -> Result<(), ForwardError> {
        let resp = self
            .http
            .post(format!("{}/api/command/status", self.base_url))
            .json(&StatusUpdate {
                device,
                command,
                status,
            })
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ForwardError::Status(resp.status()));
        }
        Ok(())
    }
}
