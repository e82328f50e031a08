//! TOML configuration for the aggregator.

use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub labels: Labels,
    pub logging: Logging,
    pub telemetry: Telemetry,
    pub targets: Targets,
    pub web_api: WebApi,
    #[serde(default)]
    pub commands: Commands,
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
pub struct Telemetry {
    /// Seconds between reconnect attempts after a failed dial.
    pub retry_interval: u64,
    /// Deadline in seconds for raw TCP connect/read/write against a device.
    #[serde(default = "default_read_timeout")]
    pub read_timeout: u64,
}

fn default_read_timeout() -> u64 {
    5
}

/// Parallel arrays, one entry per device; validated to be equal length.
#[derive(Debug, Clone, Deserialize)]
pub struct Targets {
    pub hosts: Vec<String>,
    pub ports: Vec<u16>,
    pub frequencies: Vec<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebApi {
    pub base_url: String,
    /// Seconds before an ingestion HTTP call is abandoned.
    pub timeout: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Commands {
    /// Seconds between command-dispatch ticks, independent of poll
    /// frequencies.
    #[serde(default = "default_command_interval")]
    pub interval: u64,
}

impl Default for Commands {
    fn default() -> Self {
        Self {
            interval: default_command_interval(),
        }
    }
}

fn default_command_interval() -> u64 {
    5
}

/// One configured device: its address and how often to poll it. Immutable
/// for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTarget {
    pub host: String,
    pub port: u16,
    pub frequency: Duration,
}

impl HostTarget {
    /// `host:port`, the device identity used for dialing and command
    /// listing.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Config> {
        let contents = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
        let cfg: Config = toml::from_str(&contents).context("parsing config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            !self.labels.environment.is_empty(),
            "labels.environment must not be empty"
        );
        ensure!(
            !self.labels.service.is_empty(),
            "labels.service must not be empty"
        );
        ensure!(
            !self.logging.level.is_empty(),
            "logging.level must not be empty"
        );
        ensure!(
            self.telemetry.retry_interval > 0,
            "telemetry.retry_interval must be positive"
        );
        ensure!(
            self.telemetry.read_timeout > 0,
            "telemetry.read_timeout must be positive"
        );
        ensure!(!self.targets.hosts.is_empty(), "targets.hosts must not be empty");
        ensure!(
            self.targets.hosts.len() == self.targets.ports.len(),
            "targets.hosts and targets.ports must be equal in length"
        );
        ensure!(
            self.targets.hosts.len() == self.targets.frequencies.len(),
            "targets.hosts and targets.frequencies must be equal in length"
        );
        ensure!(
            self.targets.frequencies.iter().all(|f| *f > 0),
            "targets.frequencies must all be positive"
        );
        ensure!(
            !self.web_api.base_url.is_empty(),
            "web_api.base_url must not be empty"
        );
        ensure!(self.web_api.timeout > 0, "web_api.timeout must be positive");
        ensure!(
            self.commands.interval > 0,
            "commands.interval must be positive"
        );
        Ok(())
    }

    /// The configured devices, in configuration order.
    pub fn targets(&self) -> Vec<HostTarget> {
        self.targets
            .hosts
            .iter()
            .zip(&self.targets.ports)
            .zip(&self.targets.frequencies)
            .map(|((host, port), frequency)| HostTarget {
                host: host.clone(),
                port: *port,
                frequency: Duration::from_secs(*frequency),
            })
            .collect()
    }
}
