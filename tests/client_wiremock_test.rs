//! End-to-end client tests against a wiremock audit service

use std::time::Duration;

use audit_client::{Attributes, AuditClient, AuditClientConfig, AuditEvent, RequestContext, Severity};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// HELPERS
// =============================================================================

fn config(server: &MockServer) -> AuditClientConfig {
    AuditClientConfig::default()
        .with_base_url(format!("{}/api/v1", server.uri()))
        .with_service("test-service", "1.0.0")
        .with_environment("testing")
        .with_async(false)
        .with_retry(1, Duration::from_millis(10))
}

fn client(server: &MockServer) -> AuditClient {
    AuditClient::new(config(server)).unwrap()
}

fn attrs(value: Value) -> Attributes {
    match value {
        Value::Object(map) => map,
        _ => Attributes::new(),
    }
}

async fn single_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    serde_json::from_slice(&requests[0].body).unwrap()
}

// =============================================================================
// SINGLE EVENT
// =============================================================================

#[tokio::test]
async fn test_log_sends_headers_and_enriched_body() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/audits"))
        .and(header("content-type", "application/json"))
        .and(header("accept", "application/json"))
        .and(header("user-agent", "AuditClient/test-service/1.0.0"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    // Act
    let ok = client(&server)
        .log(AuditEvent::new("user_login").with_user(123))
        .await;

    // Assert
    assert!(ok);
    let body = single_body(&server).await;
    assert_eq!(body["event"], "user_login");
    assert_eq!(body["user_id"], 123);
    assert_eq!(body["service_name"], "test-service");
    assert_eq!(body["service_version"], "1.0.0");
    assert_eq!(body["environment"], "testing");
    assert_eq!(body["severity"], "info");
    assert!(body["event_timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_api_key_header_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/audits"))
        .and(header("x-api-key", "secret-key"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = AuditClient::new(config(&server).with_api_key("secret-key")).unwrap();

    assert!(client.log("test_event").await);
}

#[tokio::test]
async fn test_server_error_is_false_and_not_retried() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/audits"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "Internal server error"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = AuditClient::new(
        config(&server).with_retry(3, Duration::from_millis(10)),
    )
    .unwrap();

    // Act
    let ok = client.log("test_event").await;

    // Assert
    assert!(!ok);
}

#[tokio::test]
async fn test_ok_without_created_is_false() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;

    assert!(!client(&server).log("test_event").await);
}

#[tokio::test]
async fn test_sub_second_timeouts_still_deliver() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/audits"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server)
        .with_timeouts(Duration::from_millis(500), Duration::from_millis(500));

    // Act
    let ok = AuditClient::new(config).unwrap().log("quick_event").await;

    // Assert
    assert!(ok);
}

#[tokio::test]
async fn test_zero_timeouts_disable_the_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_millis(50)))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server).with_timeouts(Duration::ZERO, Duration::ZERO);

    assert!(AuditClient::new(config).unwrap().log("unbounded").await);
}

#[tokio::test]
async fn test_connection_refused_is_false() {
    let config = AuditClientConfig::default()
        .with_base_url("http://127.0.0.1:1/api/v1")
        .with_async(false)
        .with_retry(1, Duration::from_millis(10))
        .with_timeouts(Duration::from_secs(2), Duration::from_secs(1));
    let client = AuditClient::new(config).unwrap();

    assert!(!client.log("test_event").await);
}

#[tokio::test]
async fn test_async_log_returns_true_and_still_delivers() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/audits"))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_millis(200)))
        .mount(&server)
        .await;

    let client = AuditClient::new(config(&server).with_async(true)).unwrap();

    // Act
    let ok = client.log("fire_and_forget").await;

    // Assert
    assert!(ok);
    let mut delivered = false;
    for _ in 0..100 {
        if !server.received_requests().await.unwrap().is_empty() {
            delivered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(delivered);
}

#[tokio::test]
async fn test_caller_fields_win_over_enrichment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let event = AuditEvent::new("imported")
        .with_field("service_name", "legacy-importer")
        .with_field("event_timestamp", "2020-01-01T00:00:00Z")
        .with_severity(Severity::Error);

    assert!(client(&server).log(event).await);

    let body = single_body(&server).await;
    assert_eq!(body["service_name"], "legacy-importer");
    assert_eq!(body["event_timestamp"], "2020-01-01T00:00:00Z");
    assert_eq!(body["severity"], "error");
}

#[tokio::test]
async fn test_request_context_fields_are_attached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let client = client(&server);
    let context = RequestContext::new()
        .with_ip("10.0.0.7")
        .with_user_agent("Mozilla/5.0")
        .with_url("https://app.example/orders");

    assert!(context.scope(client.log("order_viewed")).await);

    let body = single_body(&server).await;
    assert_eq!(body["ip_address"], "10.0.0.7");
    assert_eq!(body["user_agent"], "Mozilla/5.0");
    assert_eq!(body["url"], "https://app.example/orders");
}

// =============================================================================
// CORRELATION CONTEXTS
// =============================================================================

#[tokio::test]
async fn test_correlation_ids_reach_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "correlation_id": "corr-1",
            "request_id": "req-1"
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server)
        .with_correlation("corr-1")
        .with_request("req-1");

    assert!(client.log("checkout").await);
}

#[tokio::test]
async fn test_parent_client_untouched_by_derivation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let parent = client(&server);
    let _child = parent.with_session("sess-1");

    assert!(parent.log("plain").await);

    let body = single_body(&server).await;
    assert!(body.get("session_id").is_none());
}

// =============================================================================
// HELPERS (typed)
// =============================================================================

#[tokio::test]
async fn test_user_action_end_to_end() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/audits"))
        .and(body_partial_json(json!({
            "event": "profile_updated",
            "action_type": "PROFILE_UPDATED",
            "user_id": 123,
            "user_type": "User",
            "old_values": {"name": "John"},
            "new_values": {"name": "Jane"},
            "metadata": {"field": "name"},
            "service_name": "test-service",
            "severity": "info"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"success": true, "data": {"id": 1}})))
        .expect(1)
        .mount(&server)
        .await;

    // Act
    let ok = client(&server)
        .log_user_action(
            "profile_updated",
            123,
            Some("User"),
            Some(attrs(json!({"name": "John"}))),
            Some(attrs(json!({"name": "Jane"}))),
            attrs(json!({"field": "name"})),
            Severity::Info,
        )
        .await;

    // Assert
    assert!(ok);
}

#[tokio::test]
async fn test_slow_operation_is_logged_as_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "event": "performance_report_export",
            "severity": "error",
            "metadata": {"duration_seconds": 12.5}
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    assert!(
        client(&server)
            .log_performance("report_export", 12.5, Attributes::new())
            .await
    );
}

// =============================================================================
// BATCH
// =============================================================================

#[tokio::test]
async fn test_batch_partial_failure() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/audits/batch"))
        .respond_with(ResponseTemplate::new(207).set_body_json(json!({
            "success": false,
            "data": {
                "created": [{"id": 1}],
                "errors": [{"index": 1, "error": "Validation failed"}]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    // Act
    let result = client(&server)
        .log_batch(vec![AuditEvent::new("valid_event"), AuditEvent::new("rejected_event")])
        .await;

    // Assert
    assert!(!result.success);
    assert_eq!(result.created, 1);
    assert_eq!(result.errors, 1);

    let body = single_body(&server).await;
    let audits = body["audits"].as_array().unwrap();
    assert_eq!(audits.len(), 2);
    assert_eq!(audits[0]["service_name"], "test-service");
}

#[tokio::test]
async fn test_batch_server_error_is_total_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/audits/batch"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = client(&server).log_batch(vec!["a", "b", "c"]).await;

    assert!(!result.success);
    assert_eq!(result.created, 0);
    assert_eq!(result.errors, 3);
}

// =============================================================================
// HEALTH
// =============================================================================

#[tokio::test]
async fn test_health_check_healthy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "service": "audit-logs",
            "timestamp": "2023-01-01T00:00:00Z",
            "version": "1.0.0"
        })))
        .mount(&server)
        .await;

    let report = client(&server).health_check().await;

    assert!(report.healthy);
    assert_eq!(report.service.as_deref(), Some("audit-logs"));
    assert_eq!(report.version.as_deref(), Some("1.0.0"));
}

#[tokio::test]
async fn test_health_check_unreachable() {
    let config = AuditClientConfig::default()
        .with_base_url("http://127.0.0.1:1")
        .with_retry(1, Duration::from_millis(10));
    let report = AuditClient::new(config).unwrap().health_check().await;

    assert!(!report.healthy);
    assert!(report.error.is_some());
}
