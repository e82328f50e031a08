//! Metric payload model: `key: value` pairs with a uniform batch timestamp.
//! Values travel as text on every transport; typed interpretation is left to
//! the ingestion service.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved payload key carrying the timestamp for the whole batch.
pub const RECORDED_AT_KEY: &str = "recorded_at";

/// Closed unit vocabulary known to both sides of the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Percent,
    Seconds,
    Color,
    Unknown,
}

impl Unit {
    /// Static type -> unit table. Unknown metric types fall back to
    /// `Unknown` instead of failing the decode.
    pub fn for_metric(metric_type: &str) -> Self {
        match metric_type {
            "memory_used" | "disk_used" => Unit::Percent,
            "uptime" => Unit::Seconds,
            "car_light" | "ped_light" => Unit::Color,
            _ => Unit::Unknown,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Unit::Percent => "percent",
            Unit::Seconds => "seconds",
            Unit::Color => "color",
            Unit::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    #[serde(rename = "type")]
    pub metric_type: String,
    pub value: String,
    pub unit: Unit,
    pub recorded_at: String,
}

/// One poll cycle's worth of metrics for a single device.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceMetrics {
    /// Assigned by the poller from its configured host string; travels in
    /// the X-DeviceID header, never in the JSON body or the frame.
    #[serde(skip)]
    pub device: String,
    pub metrics: Vec<Metric>,
}

/// Current UTC time in RFC 3339, the wire timestamp format.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a decoded payload into metrics. The reserved `recorded_at` key
/// supplies the batch timestamp; without it the current UTC time is stamped
/// once and applied to every metric in the batch. Malformed pairs are
/// skipped.
pub fn parse_payload(payload: &str) -> Vec<Metric> {
    let mut metrics = Vec::new();
    let mut recorded_at: Option<String> = None;

    for pair in payload.split(", ") {
        let Some((key, value)) = pair.split_once(": ") else {
            continue;
        };
        if key == RECORDED_AT_KEY {
            recorded_at = Some(value.to_string());
            continue;
        }
        metrics.push(Metric {
            metric_type: key.to_string(),
            value: value.to_string(),
            unit: Unit::for_metric(key),
            recorded_at: String::new(),
        });
    }

    let stamp = recorded_at.unwrap_or_else(now_rfc3339);
    for metric in &mut metrics {
        metric.recorded_at = stamp.clone();
    }
    metrics
}

/// Render collected pairs as payload text, appending the batch timestamp
/// last: `key: value, key: value, recorded_at: <RFC3339>`.
pub fn render_payload(pairs: &[(String, String)], recorded_at: &str) -> String {
    let mut out = String::new();
    for (key, value) in pairs {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(value);
        out.push_str(", ");
    }
    out.push_str(RECORDED_AT_KEY);
    out.push_str(": ");
    out.push_str(recorded_at);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_table_is_closed() {
        assert_eq!(Unit::for_metric("memory_used"), Unit::Percent);
        assert_eq!(Unit::for_metric("disk_used"), Unit::Percent);
        assert_eq!(Unit::for_metric("uptime"), Unit::Seconds);
        assert_eq!(Unit::for_metric("car_light"), Unit::Color);
        assert_eq!(Unit::for_metric("ped_light"), Unit::Color);
        assert_eq!(Unit::for_metric("humidity"), Unit::Unknown);
    }

    #[test]
    fn parse_payload_with_recorded_at() {
        let metrics =
            parse_payload("uptime: 120, memory_used: 55.00, recorded_at: 2024-01-01T00:00:00Z");
        assert_eq!(metrics.len(), 2);

        assert_eq!(metrics[0].metric_type, "uptime");
        assert_eq!(metrics[0].value, "120");
        assert_eq!(metrics[0].unit, Unit::Seconds);
        assert_eq!(metrics[0].recorded_at, "2024-01-01T00:00:00Z");

        assert_eq!(metrics[1].metric_type, "memory_used");
        assert_eq!(metrics[1].value, "55.00");
        assert_eq!(metrics[1].unit, Unit::Percent);
        assert_eq!(metrics[1].recorded_at, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn parse_payload_without_recorded_at_stamps_batch_uniformly() {
        let metrics = parse_payload("uptime: 3600, memory_used: 42.10, disk_used: 70.00");
        assert_eq!(metrics.len(), 3);
        let stamp = &metrics[0].recorded_at;
        assert!(!stamp.is_empty());
        assert!(metrics.iter().all(|m| &m.recorded_at == stamp));
    }

    #[test]
    fn parse_payload_skips_malformed_pairs() {
        let metrics = parse_payload("uptime: 10, garbage, car_light: red");
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].metric_type, "uptime");
        assert_eq!(metrics[1].metric_type, "car_light");
        assert_eq!(metrics[1].unit, Unit::Color);
    }

    #[test]
    fn render_payload_appends_timestamp_last() {
        let pairs = vec![
            ("uptime".to_string(), "120".to_string()),
            ("memory_used".to_string(), "55.00".to_string()),
        ];
        let payload = render_payload(&pairs, "2024-01-01T00:00:00Z");
        assert_eq!(
            payload,
            "uptime: 120, memory_used: 55.00, recorded_at: 2024-01-01T00:00:00Z"
        );
    }

    #[test]
    fn rendered_payload_parses_back() {
        let pairs = vec![("disk_used".to_string(), "81.55".to_string())];
        let payload = render_payload(&pairs, "2024-06-01T12:00:00Z");
        let metrics = parse_payload(&payload);
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].metric_type, "disk_used");
        assert_eq!(metrics[0].unit, Unit::Percent);
        assert_eq!(metrics[0].recorded_at, "2024-06-01T12:00:00Z");
    }

    #[test]
    fn device_metrics_json_excludes_device_field() {
        let batch = DeviceMetrics {
            device: "10.0.0.5".to_string(),
            metrics: vec![Metric {
                metric_type: "uptime".to_string(),
                value: "120".to_string(),
                unit: Unit::Seconds,
                recorded_at: "2024-01-01T00:00:00Z".to_string(),
            }],
        };
        let json = serde_json::to_value(&batch).unwrap();
        assert!(json.get("device").is_none());
        assert_eq!(json["metrics"][0]["type"], "uptime");
        assert_eq!(json["metrics"][0]["unit"], "seconds");
    }
}
