use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

use super::chat_response::ChatResponse;

/// Detail reported when a job ends in error without saying why.
pub const NO_ERROR_DETAIL: &str = "chat job failed without detail";

/// Identifier the backend assigns to an accepted chat request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatJobHandle {
    pub chatbot_request_id: String,
}

impl ChatJobHandle {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            chatbot_request_id: request_id.into(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.chatbot_request_id
    }
}

impl fmt::Display for ChatJobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.chatbot_request_id)
    }
}

/// Lifecycle of a chat job as reported by the status endpoint.
///
/// `Pending` loops on itself until the job reaches `Complete` or `Error`.
/// Status strings the client does not recognise are kept as `Other` and
/// treated as still running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobState {
    Pending,
    Complete,
    Error,
    Other(String),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Complete | JobState::Error)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobState::Pending => "pending",
            JobState::Complete => "complete",
            JobState::Error => "error",
            JobState::Other(raw) => raw,
        }
    }
}

impl From<&str> for JobState {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" | "processing" | "queued" => JobState::Pending,
            "complete" | "completed" | "success" => JobState::Complete,
            "error" | "failed" => JobState::Error,
            _ => JobState::Other(raw.to_string()),
        }
    }
}

impl From<String> for JobState {
    fn from(raw: String) -> Self {
        JobState::from(raw.as_str())
    }
}

impl From<JobState> for String {
    fn from(state: JobState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `GET /chatbot?url=<request id>`.
///
/// `result` stays raw JSON until the state is known: the backend stores an
/// empty string while processing and a plain error message on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatJobStatus {
    pub status: JobState,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

impl ChatJobStatus {
    /// Human-readable reason for a failed job.
    pub fn error_detail(&self) -> String {
        match &self.result {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(serde_json::Value::Object(map)) => match map.get("error") {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => serde_json::Value::Object(map.clone()).to_string(),
            },
            Some(serde_json::Value::Null) | Some(serde_json::Value::String(_)) | None => {
                NO_ERROR_DETAIL.to_string()
            }
            Some(other) => other.to_string(),
        }
    }

    /// Decode the result of a completed job.
    pub fn into_response(self) -> Result<ChatResponse, CoreError> {
        match self.result {
            None | Some(serde_json::Value::Null) => Err(CoreError::MissingField("result".to_string())),
            Some(serde_json::Value::String(s)) if s.is_empty() => {
                Err(CoreError::MissingField("result".to_string()))
            }
            Some(value) => ChatResponse::try_from(value),
        }
    }
}
