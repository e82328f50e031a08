//! Test fixtures: a fake ingestion service (axum) and a fake device that
//! answers every connection with one canned byte response.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
pub struct IngestLog {
    /// (X-DeviceID header, request body) per /metric call.
    pub metrics: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
    /// Bodies posted to /api/command/status.
    pub statuses: Arc<Mutex<Vec<serde_json::Value>>>,
    /// Canned response for /api/command.
    pub pending: Arc<Mutex<Vec<serde_json::Value>>>,
    /// X-DeviceID header per /api/command call.
    pub command_queries: Arc<Mutex<Vec<String>>>,
}

pub async fn spawn_ingest(log: IngestLog) -> String {
    let app = Router::new()
        .route("/metric", post(record_metrics))
        .route("/api/command", get(list_commands))
        .route("/api/command/status", post(record_status))
        .with_state(log);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn record_metrics(
    State(log): State<IngestLog>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    let device = headers
        .get("X-DeviceID")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    log.metrics.lock().unwrap().push((device, body));
    StatusCode::OK
}

async fn list_commands(
    State(log): State<IngestLog>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    let device = headers
        .get("X-DeviceID")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    log.command_queries.lock().unwrap().push(device);
    Json(serde_json::Value::Array(log.pending.lock().unwrap().clone()))
}

async fn record_status(
    State(log): State<IngestLog>,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    log.statuses.lock().unwrap().push(body);
    StatusCode::OK
}

/// Spawn a device that answers every connection with `response` and closes.
/// Returns its `host:port` address.
pub async fn spawn_device(response: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let response = response.clone();
            tokio::spawn(async move {
                let mut request = [0u8; 512];
                let _ = stream.read(&mut request).await;
                let _ = stream.write_all(&response).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    addr
}
