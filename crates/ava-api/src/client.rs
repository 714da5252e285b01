use std::sync::Arc;

use ava_auth::session::TokenProvider;
use ava_core::models::catalog::{KnowledgeBaseDescriptor, KnowledgeBaseList, ModelDescriptor};
use ava_core::models::chat_job::{ChatJobHandle, ChatJobStatus};
use ava_core::models::chat_request::ChatRequest;
use ava_core::models::chat_response::ChatResponse;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::error::{ApiError, remote_message};
use crate::poll::PollPolicy;

/// Body of `POST /chatbot`. The backend answers 200 with `error` set when
/// it could not enqueue the job.
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    chatbot_request_id: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Authenticated client for the chat API.
///
/// Every call asks the [`TokenProvider`] for a fresh id token first and
/// sends it as `Authorization: Bearer <token>`; nothing is cached here.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
    poll: PollPolicy,
}

impl ApiClient {
    /// Fails with [`ApiError::Client`] if the base URL is missing or not an
    /// absolute http(s) URL.
    pub fn new(config: ApiConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self, ApiError> {
        let base_url = parse_base_url(&config.base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Client(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            tokens,
            poll: config.poll,
        })
    }

    pub fn poll_policy(&self) -> &PollPolicy {
        &self.poll
    }

    /// `GET /models`
    pub async fn list_models(&self) -> Result<Vec<ModelDescriptor>, ApiError> {
        let models: Vec<ModelDescriptor> = self
            .send_json(self.request(Method::GET, "models").await?)
            .await?;
        debug!(count = models.len(), "fetched models");
        Ok(models)
    }

    /// `GET /knowledge-bases`
    pub async fn list_knowledge_bases(&self) -> Result<Vec<KnowledgeBaseDescriptor>, ApiError> {
        let list: KnowledgeBaseList = self
            .send_json(self.request(Method::GET, "knowledge-bases").await?)
            .await?;
        debug!(count = list.knowledge_bases.len(), "fetched knowledge bases");
        Ok(list.knowledge_bases)
    }

    /// `POST /chatbot` — enqueue a chat job.
    pub async fn submit_chat(&self, request: &ChatRequest) -> Result<ChatJobHandle, ApiError> {
        request.validate()?;

        let builder = self.request(Method::POST, "chatbot").await?.json(request);
        let resp: SubmitResponse = self.send_json(builder).await?;

        match resp {
            SubmitResponse {
                chatbot_request_id: Some(id),
                ..
            } if !id.is_empty() => {
                info!(
                    request_id = %id,
                    knowledge_base_id = %request.knowledge_base_id,
                    model_arn = %request.model_arn,
                    "chat job submitted"
                );
                Ok(ChatJobHandle::new(id))
            }
            SubmitResponse { error: Some(err), .. } => {
                let message = match err {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                warn!(error = %message, "chat submission rejected");
                Err(ApiError::Remote {
                    status: None,
                    message,
                })
            }
            _ => Err(ApiError::Remote {
                status: None,
                message: "response did not include a chatbot_request_id".to_string(),
            }),
        }
    }

    /// `GET /chatbot?url=<request id>` — read the job's current status.
    pub async fn poll_chat_status(&self, handle: &ChatJobHandle) -> Result<ChatJobStatus, ApiError> {
        let builder = self
            .request(Method::GET, "chatbot")
            .await?
            .query(&[("url", handle.request_id())]);
        let status: ChatJobStatus = self.send_json(builder).await?;
        debug!(request_id = %handle, status = %status.status, "polled chat job");
        Ok(status)
    }

    /// Submit `request` and wait for its answer using the configured poll policy.
    pub async fn ask(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        crate::chat::ask(self, request, &self.poll, &CancellationToken::new()).await
    }

    /// Resolve a bearer token and start a request to `path`.
    ///
    /// Token resolution happens before anything touches the network; its
    /// failure is returned unchanged as [`ApiError::Auth`].
    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let token = self.tokens.id_token().await?;
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ApiError::Client(format!("invalid request path {path:?}: {e}")))?;
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let resp = builder.send().await.map_err(|e| {
            let err = ApiError::from_transport(e);
            if let ApiError::Network { detail } = &err {
                warn!(%detail, "no response from API");
            }
            err
        })?;

        let status = resp.status();
        let body = resp.text().await.map_err(ApiError::from_transport)?;

        if !status.is_success() {
            warn!(status = status.as_u16(), %body, "API returned an error");
            return Err(ApiError::Remote {
                status: Some(status.as_u16()),
                message: remote_message(status.as_u16(), &body),
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Remote {
            status: Some(status.as_u16()),
            message: format!("unexpected response body: {e}"),
        })
    }
}

/// Parse the base URL, forcing a trailing slash so relative joins append
/// to the path instead of replacing its last segment.
fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Client("API URL is not defined".to_string()));
    }

    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };

    let url = Url::parse(&with_slash)
        .map_err(|e| ApiError::Client(format!("invalid API URL {trimmed:?}: {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ApiError::Client(format!("unsupported API URL scheme: {other}"))),
    }
}
