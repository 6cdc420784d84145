//! Mock transport for testing
//!
//! Returns queued replies without touching the network and records every
//! request for assertions.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::{HttpRequest, HttpResponse, Transport};
use crate::error::{AuditError, Result};

/// What the mock answers with
#[derive(Debug, Clone)]
pub enum MockReply {
    Response(HttpResponse),
    NetworkError(String),
    Timeout(String),
}

/// Mock transport that replays predefined replies (FIFO)
///
/// Clones share the same queue and request log.
#[derive(Debug, Clone)]
pub struct MockTransport {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    /// Reply when the queue is empty
    default_reply: MockReply,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockTransport {
    /// Answers every request with `201 {"success": true}`
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            default_reply: MockReply::Response(HttpResponse::json(201, &json!({"success": true}))),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the reply used once the queue is drained
    pub fn with_default(mut self, reply: MockReply) -> Self {
        self.default_reply = reply;
        self
    }

    pub fn queue(&self, reply: MockReply) {
        self.replies.lock().push_back(reply);
    }

    pub fn queue_response(&self, status: u16, body: Value) {
        self.queue(MockReply::Response(HttpResponse::json(status, &body)));
    }

    pub fn queue_network_error(&self, message: impl Into<String>) {
        self.queue(MockReply::NetworkError(message.into()));
    }

    /// All requests seen so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().last().cloned()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().push(request);

        let reply = self
            .replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_reply.clone());

        match reply {
            MockReply::Response(response) => Ok(response),
            MockReply::NetworkError(message) => Err(AuditError::Network(message)),
            MockReply::Timeout(message) => Err(AuditError::Timeout(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::EVENTS_PATH;

    #[tokio::test]
    async fn test_default_reply_is_created() {
        let mock = MockTransport::new();
        let response = mock
            .send(HttpRequest::post(EVENTS_PATH, json!({"event": "x"})))
            .await
            .unwrap();

        assert_eq!(response.status, 201);
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn test_queued_replies_in_order() {
        let mock = MockTransport::new();
        mock.queue_response(500, json!({"error": "boom"}));
        mock.queue_network_error("connection refused");

        let first = mock.send(HttpRequest::get("/health")).await.unwrap();
        let second = mock.send(HttpRequest::get("/health")).await;
        let third = mock.send(HttpRequest::get("/health")).await.unwrap();

        assert_eq!(first.status, 500);
        assert!(matches!(second, Err(AuditError::Network(_))));
        assert_eq!(third.status, 201);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let mock = MockTransport::new();
        let clone = mock.clone();

        clone.send(HttpRequest::get("/health")).await.unwrap();

        assert_eq!(mock.request_count(), 1);
        assert_eq!(mock.last_request().unwrap().path, "/health");
        mock.clear_requests();
        assert_eq!(clone.request_count(), 0);
    }
}
