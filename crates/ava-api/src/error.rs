use std::time::Duration;

use ava_auth::error::AuthError;
use ava_core::error::CoreError;
use thiserror::Error;

/// Message carried by every [`ApiError::Network`].
pub const NETWORK_ERROR_MESSAGE: &str = "Network error occurred";

/// Every failure an API call or chat flow can end in.
///
/// Transport failures fall into exactly three groups: the server answered
/// with an error (`Remote`), nothing came back (`Network`), or the request
/// never left the process (`Client`).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Client(String),

    #[error("{}", NETWORK_ERROR_MESSAGE)]
    Network { detail: String },

    #[error("{message}")]
    Remote { status: Option<u16>, message: String },

    #[error("chat job failed: {0}")]
    JobFailed(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("chat job {request_id} did not finish within {waited:?}")]
    PollTimeout { request_id: String, waited: Duration },

    #[error("chat request cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Remote { status, .. } => *status,
            _ => None,
        }
    }

    /// Classify a transport error from reqwest.
    pub(crate) fn from_transport(e: reqwest::Error) -> Self {
        if e.is_builder() {
            return ApiError::Client(e.to_string());
        }
        if e.is_decode() {
            return ApiError::Remote {
                status: e.status().map(|s| s.as_u16()),
                message: format!("unexpected response body: {e}"),
            };
        }
        ApiError::Network {
            detail: format_err_chain(&e),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        ApiError::Client(e.to_string())
    }
}

/// Message to surface for a non-2xx response body.
///
/// A JSON object with an `error` field yields that field; any other JSON is
/// serialized compactly; plain text is returned as-is; an empty body falls
/// back to the status code.
pub fn remote_message(status: u16, body: &str) -> String {
    if body.trim().is_empty() {
        return format!("HTTP {status}");
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) if map.contains_key("error") => match &map["error"] {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        },
        Ok(value) => value.to_string(),
        Err(_) => body.to_string(),
    }
}

/// Walk the full error chain and join all causes into one string.
pub fn format_err_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
