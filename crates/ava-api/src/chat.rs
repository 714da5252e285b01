//! Ask-and-wait over the asynchronous chat job API.
//!
//! A job moves `Submitted → Pending* → {Complete, Error}`. Submission must
//! return a handle before the first poll, and nothing is retried: the first
//! failure from either call ends the flow.

use ava_core::models::chat_job::{ChatJobHandle, JobState};
use ava_core::models::chat_request::ChatRequest;
use ava_core::models::chat_response::ChatResponse;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::poll::PollPolicy;

/// Submit `request` and poll until the job finishes.
///
/// Returns the job's `result` on completion, [`ApiError::JobFailed`] when
/// the backend reports an error, [`ApiError::PollTimeout`] once `policy`'s
/// deadline passes, and [`ApiError::Cancelled`] as soon as `cancel` fires.
pub async fn ask(
    client: &ApiClient,
    request: &ChatRequest,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> Result<ChatResponse, ApiError> {
    if cancel.is_cancelled() {
        return Err(ApiError::Cancelled);
    }

    let handle = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ApiError::Cancelled),
        submitted = client.submit_chat(request) => submitted?,
    };

    wait_for_answer(client, &handle, policy, cancel).await
}

/// Poll an already-submitted job until it reaches a terminal state.
pub async fn wait_for_answer(
    client: &ApiClient,
    handle: &ChatJobHandle,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> Result<ChatResponse, ApiError> {
    let started = Instant::now();
    let mut delays = policy.delays();
    let mut attempts: u32 = 0;

    loop {
        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ApiError::Cancelled),
            polled = client.poll_chat_status(handle) => polled?,
        };
        attempts += 1;

        match status.status {
            JobState::Complete => {
                info!(request_id = %handle, attempts, elapsed = ?started.elapsed(), "chat job complete");
                return status.into_response().map_err(|e| ApiError::Remote {
                    status: None,
                    message: format!("invalid chat result: {e}"),
                });
            }
            JobState::Error => {
                let detail = status.error_detail();
                warn!(request_id = %handle, attempts, %detail, "chat job failed");
                return Err(ApiError::JobFailed(detail));
            }
            JobState::Pending | JobState::Other(_) => {}
        }

        let delay = delays.next().unwrap_or(policy.max_interval);
        let waited = started.elapsed();
        if waited + delay > policy.max_wait {
            warn!(request_id = %handle, attempts, ?waited, "gave up waiting for chat job");
            return Err(ApiError::PollTimeout {
                request_id: handle.request_id().to_string(),
                waited,
            });
        }

        debug!(request_id = %handle, status = %status.status, ?delay, "chat job still running");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ApiError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
