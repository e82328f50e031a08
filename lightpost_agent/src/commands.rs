//! HTTP command endpoint: a single JSON command object per request, plus the
//! HTTP flavor of the metric endpoint (the frame wrapped in a response body).

use crate::actions::{self, ActionError};
use crate::collect::Collector;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use lightpost_proto::frame;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub value: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub status: String,
    pub message: String,
}

pub fn router(collector: Collector) -> Router {
    Router::new()
        .route("/cmd", post(handle_command))
        .route("/metric", get(handle_metric))
        .with_state(collector)
}

pub async fn serve(listener: TcpListener, collector: Collector) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "command endpoint listening");
    axum::serve(listener, router(collector)).await?;
    Ok(())
}

async fn handle_command(
    Json(req): Json<CommandRequest>,
) -> (StatusCode, Json<CommandResponse>) {
    match actions::run(&req.command, req.value) {
        Ok(message) => {
            info!(command = %req.command, "command executed");
            (
                StatusCode::OK,
                Json(CommandResponse {
                    status: "success".to_string(),
                    message,
                }),
            )
        }
        Err(ActionError::Unknown(name)) => {
            warn!(command = %name, "unknown command");
            (
                StatusCode::BAD_REQUEST,
                Json(CommandResponse {
                    status: "error".to_string(),
                    message: format!("unknown command: {name}"),
                }),
            )
        }
        Err(err) => {
            error!(command = %req.command, %err, "command failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CommandResponse {
                    status: "error".to_string(),
                    message: err.to_string(),
                }),
            )
        }
    }
}

async fn handle_metric(State(collector): State<Collector>) -> Response {
    let payload = collector.payload().await;
    match frame::encode(&payload) {
        Ok(framed) => (StatusCode::OK, framed.to_vec()).into_response(),
        Err(err) => {
            error!(%err, "failed to frame metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
