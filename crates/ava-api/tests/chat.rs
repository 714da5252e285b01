use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ava_api::chat::ask;
use ava_api::config::ApiConfig;
use ava_api::error::ApiError;
use ava_api::{ApiClient, PollPolicy};
use ava_auth::session::StaticToken;
use ava_core::models::chat_request::{ChatRequest, TextInferenceConfig};
use ava_core::models::chat_response::ChatResponse;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn fast_policy() -> PollPolicy {
    PollPolicy::fixed(Duration::from_millis(10), Duration::from_secs(5))
}

fn client_for(server: &ServerGuard) -> ApiClient {
    let config = ApiConfig::new(server.url()).with_poll_policy(fast_policy());
    ApiClient::new(config, Arc::new(StaticToken::new("test-token"))).unwrap()
}

fn sample_request() -> ChatRequest {
    ChatRequest::new("hello", "kb1", "arn:model1")
        .with_inference_config(TextInferenceConfig::new(100, 0.5, 0.9))
}

/// Serve `bodies` in order, repeating the last one once they run out.
fn sequenced(bodies: Vec<String>) -> impl Fn(&mockito::Request) -> Vec<u8> + Send + Sync + 'static {
    let calls = AtomicUsize::new(0);
    move |_| {
        let i = calls.fetch_add(1, Ordering::SeqCst).min(bodies.len() - 1);
        bodies[i].clone().into_bytes()
    }
}

async fn mock_submit(server: &mut ServerGuard, request_id: &str) -> Mock {
    server
        .mock("POST", "/chatbot")
        .with_status(200)
        .with_body(json!({"chatbot_request_id": request_id}).to_string())
        .create_async()
        .await
}

async fn mock_poll(server: &mut ServerGuard, request_id: &str, bodies: Vec<String>, hits: usize) -> Mock {
    server
        .mock("GET", "/chatbot")
        .match_query(Matcher::UrlEncoded("url".into(), request_id.into()))
        .match_header("authorization", "Bearer test-token")
        .with_status(200)
        .with_body_from_request(sequenced(bodies))
        .expect(hits)
        .create_async()
        .await
}

#[tokio::test]
async fn pending_then_complete_returns_result() {
    let mut server = Server::new_async().await;
    let result = json!({
        "output": {"text": "hi there"},
        "sessionId": "sess-1",
        "citations": [{
            "generatedResponsePart": {"textResponsePart": {"text": "hi there", "span": {"start": 0, "end": 8}}},
            "retrievedReferences": [{
                "content": {"text": "greetings"},
                "location": {"type": "S3", "s3Location": {"uri": "s3://docs/hello.pdf"}}
            }]
        }]
    });

    let submit = mock_submit(&mut server, "req-123").await;
    let poll = mock_poll(
        &mut server,
        "req-123",
        vec![
            json!({"status": "pending"}).to_string(),
            json!({"status": "complete", "result": result}).to_string(),
        ],
        2,
    )
    .await;

    let client = client_for(&server);
    let response = ask(&client, &sample_request(), &fast_policy(), &CancellationToken::new())
        .await
        .unwrap();

    let expected: ChatResponse = serde_json::from_value(result.clone()).unwrap();
    assert_eq!(response, expected);
    assert_eq!(serde_json::to_value(&response).unwrap(), result);
    assert_eq!(response.text(), "hi there");
    assert_eq!(response.source_uris(), vec!["s3://docs/hello.pdf"]);

    submit.assert_async().await;
    poll.assert_async().await;
}

#[tokio::test]
async fn stored_result_is_returned_exactly() {
    let mut server = Server::new_async().await;
    let result = json!({
        "ResponseMetadata": {"RequestId": "r-1", "HTTPStatusCode": 200.0, "RetryAttempts": 0.0},
        "output": {"text": "hi there", "extra": 1},
        "sessionId": "s",
        "citations": [{
            "generatedResponsePart": {"textResponsePart": {"text": "hi there", "span": {"start": 0.0, "end": 8.0}}},
            "retrievedReferences": [{
                "location": {"s3Location": {"uri": "s3://docs/hello.pdf"}},
                "metadata": {"x-amz-bedrock-kb-document-page-number": 2.0}
            }]
        }]
    });

    mock_submit(&mut server, "req-f").await;
    mock_poll(
        &mut server,
        "req-f",
        vec![json!({"status": "success", "result": result}).to_string()],
        1,
    )
    .await;

    let response = client_for(&server).ask(&sample_request()).await.unwrap();
    assert_eq!(response.http_status_code(), Some(200));
    assert_eq!(response.source_uris(), vec!["s3://docs/hello.pdf"]);
    assert_eq!(response.into_value(), result);
}

#[tokio::test]
async fn backend_vocabulary_and_unknown_states_keep_polling() {
    let mut server = Server::new_async().await;
    mock_submit(&mut server, "req-9").await;
    let poll = mock_poll(
        &mut server,
        "req-9",
        vec![
            json!({"status": "processing", "result": ""}).to_string(),
            json!({"status": "throttled"}).to_string(),
            json!({"status": "success", "result": {"output": {"text": "done"}}}).to_string(),
        ],
        3,
    )
    .await;

    let response = client_for(&server).ask(&sample_request()).await.unwrap();
    assert_eq!(response.text(), "done");
    poll.assert_async().await;
}

#[tokio::test]
async fn error_status_fails_with_backend_detail() {
    let mut server = Server::new_async().await;
    mock_submit(&mut server, "req-err").await;
    mock_poll(
        &mut server,
        "req-err",
        vec![json!({"status": "error", "result": "AccessDeniedException: model access"}).to_string()],
        1,
    )
    .await;

    let err = client_for(&server).ask(&sample_request()).await.unwrap_err();
    match err {
        ApiError::JobFailed(detail) => assert_eq!(detail, "AccessDeniedException: model access"),
        other => panic!("expected JobFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_submission_never_polls() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chatbot")
        .with_status(400)
        .with_body(r#"{"error":"knowledgeBaseId is required in the request body"}"#)
        .create_async()
        .await;
    let poll = server
        .mock("GET", "/chatbot")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let err = client_for(&server).ask(&sample_request()).await.unwrap_err();
    assert_eq!(err.to_string(), "knowledgeBaseId is required in the request body");
    poll.assert_async().await;
}

#[tokio::test]
async fn poll_error_propagates_without_retry() {
    let mut server = Server::new_async().await;
    mock_submit(&mut server, "req-gone").await;
    let poll = server
        .mock("GET", "/chatbot")
        .match_query(Matcher::Any)
        .with_status(502)
        .with_body(r#"{"message": "Internal server error"}"#)
        .expect(1)
        .create_async()
        .await;

    let err = client_for(&server).ask(&sample_request()).await.unwrap_err();
    assert_eq!(err.status(), Some(502));
    poll.assert_async().await;
}

#[tokio::test]
async fn never_finishing_job_times_out() {
    let mut server = Server::new_async().await;
    mock_submit(&mut server, "req-slow").await;
    server
        .mock("GET", "/chatbot")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"status":"processing","result":""}"#)
        .expect_at_least(1)
        .create_async()
        .await;

    let policy = PollPolicy::fixed(Duration::from_millis(10), Duration::from_millis(60));
    let err = ask(&client_for(&server), &sample_request(), &policy, &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        ApiError::PollTimeout { request_id, .. } => assert_eq!(request_id, "req-slow"),
        other => panic!("expected PollTimeout, got {other:?}"),
    }
}

#[tokio::test]
async fn cancelled_before_start_sends_nothing() {
    let mut server = Server::new_async().await;
    let submit = server.mock("POST", "/chatbot").expect(0).create_async().await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = ask(&client_for(&server), &sample_request(), &fast_policy(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Cancelled));
    submit.assert_async().await;
}

#[tokio::test]
async fn cancellation_stops_polling() {
    let mut server = Server::new_async().await;
    mock_submit(&mut server, "req-cancel").await;
    server
        .mock("GET", "/chatbot")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"status":"pending"}"#)
        .expect_at_least(1)
        .create_async()
        .await;

    let client = client_for(&server);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let policy = PollPolicy::fixed(Duration::from_millis(10), Duration::from_secs(30));
    let err = ask(&client, &sample_request(), &policy, &cancel).await.unwrap_err();
    assert!(matches!(err, ApiError::Cancelled));
}

#[tokio::test]
async fn independent_asks_do_not_block_each_other() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chatbot")
        .match_body(Matcher::PartialJson(json!({"message": "first"})))
        .with_status(200)
        .with_body(r#"{"chatbot_request_id":"a"}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/chatbot")
        .match_body(Matcher::PartialJson(json!({"message": "second"})))
        .with_status(200)
        .with_body(r#"{"chatbot_request_id":"b"}"#)
        .create_async()
        .await;
    mock_poll(
        &mut server,
        "a",
        vec![
            json!({"status": "pending"}).to_string(),
            json!({"status": "pending"}).to_string(),
            json!({"status": "complete", "result": {"output": {"text": "A"}}}).to_string(),
        ],
        3,
    )
    .await;
    mock_poll(
        &mut server,
        "b",
        vec![json!({"status": "complete", "result": {"output": {"text": "B"}}}).to_string()],
        1,
    )
    .await;

    let client = client_for(&server);
    let first = ChatRequest::new("first", "kb1", "arn:model1");
    let second = ChatRequest::new("second", "kb1", "arn:model1");
    let (a, b) = tokio::join!(client.ask(&first), client.ask(&second));

    assert_eq!(a.unwrap().text(), "A");
    assert_eq!(b.unwrap().text(), "B");
}
