//! Local command actions. The real-world effects (desktop notifications,
//! screen brightness) live outside this layer; what matters here is the
//! invocation contract: dispatch by name with an optional value.

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("brightness value {0} is outside 0..=100")]
    InvalidValue(i64),
}

/// Run a named action. Actions are idempotent from the caller's point of
/// view; repeated delivery of the same command is safe.
pub fn run(command: &str, value: Option<i64>) -> Result<String, ActionError> {
    match command {
        "notify" => {
            notify("Lightpost Alert", "Command received from the aggregator");
            Ok("notification sent".to_string())
        }
        "brightness" => {
            // Dispatched commands carry no value on the wire; default it.
            let value = value.unwrap_or(0);
            if !(0..=100).contains(&value) {
                return Err(ActionError::InvalidValue(value));
            }
            set_brightness(value);
            Ok(format!("brightness set to {value}"))
        }
        other => Err(ActionError::Unknown(other.to_string())),
    }
}

fn notify(title: &str, body: &str) {
    info!(title, body, "notify action invoked");
}

fn set_brightness(value: i64) {
    info!(value, "brightness action invoked");
}
