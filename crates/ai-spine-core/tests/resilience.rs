//! Retry, classification and fail-fast behaviour against a mock service


use std::time::{Duration, Instant};
use ai_spine_core::{AiSpine, ClientConfig, Error, ErrorKind};
use serde_json::json;
use test_support::*;

#[tokio::test]
async fn test_server_errors_retry_then_surface() {
    let mut server = server().await;
    let mock = server
        .mock("GET", "/flows")
        .with_status(503)
        .with_body(json!({"message": "Service unavailable"}).to_string())
        .expect(4)
        .create_async()
        .await;

    let err = client_for(&server).list_flows().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Execution);
    assert_eq!(err.status_code(), Some(503));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_error_then_success() {
    let mut server = server().await;
    let failing = server
        .mock("GET", "/health")
        .with_status(500)
        .expect(2)
        .create_async()
        .await;
    server
        .mock("GET", "/health")
        .with_status(200)
        .with_body(json!({"status": "healthy"}).to_string())
        .create_async()
        .await;

    let health = client_for(&server).health_check().await.unwrap();
    assert_eq!(health["status"], "healthy");
    failing.assert_async().await;
}

#[tokio::test]
async fn test_rate_limit_honors_retry_after() {
    let mut server = server().await;
    let limited = server
        .mock("GET", "/status")
        .with_status(429)
        .with_header("retry-after", "1")
        .with_body(json!({"message": "Too many requests"}).to_string())
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/status")
        .with_status(200)
        .with_body(json!({"status": "operational"}).to_string())
        .create_async()
        .await;

    let start = Instant::now();
    let status = client_for(&server).get_status().await.unwrap();

    assert_eq!(status["status"], "operational");
    assert!(start.elapsed() >= Duration::from_secs(1), "{:?}", start.elapsed());
    limited.assert_async().await;
}

#[tokio::test]
async fn test_rate_limit_without_retries() {
    let mut server = server().await;
    let mock = server
        .mock("GET", "/flows")
        .with_status(429)
        .with_header("retry-after", "60")
        .with_body(json!({"message": "Rate limit exceeded"}).to_string())
        .expect(1)
        .create_async()
        .await;

    let config = config_for(&server)
        .api_key(TEST_API_KEY)
        .max_retries(0)
        .build()
        .unwrap();
    let err = AiSpine::new(config).unwrap().list_flows().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RateLimit);
    assert_eq!(err.retry_after(), Some(60));
    assert_eq!(err.status_code(), Some(429));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_validation_error_is_not_retried() {
    let mut server = server().await;
    let mock = server
        .mock("POST", "/flows/execute")
        .with_status(400)
        .with_body(json!({"message": "Invalid input data"}).to_string())
        .expect(1)
        .create_async()
        .await;

    let err = client_for(&server)
        .execute_flow("test-flow", json!({"text": "ok"}), None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("Invalid input data"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_post_is_not_retried_on_server_error() {
    let mut server = server().await;
    let mock = server
        .mock("POST", "/flows/execute")
        .with_status(503)
        .with_body(json!({"message": "Service unavailable"}).to_string())
        .expect(1)
        .create_async()
        .await;

    let err = client_for(&server)
        .execute_flow("test-flow", json!({"text": "ok"}), None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Execution);
    assert_eq!(err.status_code(), Some(503));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_delete_is_retried_on_server_error() {
    let mut server = server().await;
    let mock = server
        .mock("DELETE", "/agents/agent-789")
        .with_status(502)
        .expect(4)
        .create_async()
        .await;

    let err = client_for(&server).delete_agent("agent-789").await.unwrap_err();

    assert_eq!(err.status_code(), Some(502));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unauthorized_points_at_dashboard() {
    let mut server = server().await;
    let mock = server
        .mock("GET", "/flows")
        .with_status(401)
        .with_body(json!({"detail": "Invalid API key"}).to_string())
        .expect(1)
        .create_async()
        .await;

    let err = client_for(&server).list_flows().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert!(err.to_string().contains("Invalid API key"));
    assert!(err.to_string().contains(ai_spine_core::error::DASHBOARD_URL));
    // the secret itself never leaks into errors
    assert!(!err.to_string().contains(TEST_API_KEY));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_insufficient_credits() {
    let mut server = server().await;
    server
        .mock("POST", "/flows/execute")
        .with_status(403)
        .with_body(
            json!({
                "message": "Insufficient credits",
                "error_code": "INSUFFICIENT_CREDITS",
                "credits_needed": 10,
                "credits_available": 2
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let err = client_for(&server)
        .execute_flow("test-flow", json!({"text": "ok"}), None)
        .await
        .unwrap_err();

    match err {
        Error::InsufficientCredits {
            message,
            credits_needed,
            credits_available,
            ..
        } => {
            assert_eq!(credits_needed, Some(10));
            assert_eq!(credits_available, Some(2));
            assert!(message.contains(ai_spine_core::error::BILLING_URL));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_forbidden_without_credit_marker_is_authentication() {
    let mut server = server().await;
    server
        .mock("GET", "/agents")
        .with_status(403)
        .with_body(json!({"message": "Forbidden"}).to_string())
        .create_async()
        .await;

    let err = client_for(&server).list_agents().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(err.status_code(), Some(403));
}

#[tokio::test]
async fn test_malformed_success_body() {
    let mut server = server().await;
    server
        .mock("GET", "/executions/exec-123")
        .with_status(200)
        .with_body("<html>gateway</html>")
        .create_async()
        .await;

    let err = client_for(&server).get_execution("exec-123").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResponseFormat);
}

#[tokio::test]
async fn test_missing_key_fails_before_any_request() {
    let mut server = server().await;
    let mock = server
        .mock("GET", "/flows")
        .expect(0)
        .create_async()
        .await;

    let err = anonymous_client_for(&server).list_flows().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(err.status_code(), None);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_malformed_key_is_rejected_at_construction() {
    let mut server = server().await;
    let mock = server
        .mock("GET", mockito::Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let err = config_for(&server).api_key("pk_wrong_prefix").build().unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(!err.to_string().contains("pk_wrong_prefix"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_service_is_execution_error_without_status() {
    let config = ClientConfig::builder()
        .base_url("http://127.0.0.1:9")
        .api_key(TEST_API_KEY)
        .max_retries(1)
        .backoff_base(Duration::from_millis(10))
        .max_backoff(Duration::from_millis(10))
        .build()
        .unwrap();

    let err = AiSpine::new(config).unwrap().health_check().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Execution);
    assert_eq!(err.status_code(), None);
}
