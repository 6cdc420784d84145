//! # HTTP Transport Layer
//!
//! The audit client never talks to the network directly; it hands an
//! [`HttpRequest`] to a [`Transport`] and gets an [`HttpResponse`] or a
//! transport error back.
//!
//! - [`ReqwestTransport`] - production transport (headers, timeouts, retry)
//! - [`MockTransport`] - in-memory transport with queued replies
//!
//! Implementations must be safe to share across tasks: fire-and-forget
//! dispatch moves an `Arc<dyn Transport>` into a spawned task.

mod http;
mod mock;
mod retry;

pub use http::ReqwestTransport;
pub use mock::{MockReply, MockTransport};
pub use retry::RetryPolicy;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AuditError, Result};

/// Single-event endpoint
pub const EVENTS_PATH: &str = "/audits";

/// Batch endpoint
pub const BATCH_PATH: &str = "/audits/batch";

pub const HEALTH_PATH: &str = "/health";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// Request relative to the audit service base URL
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    /// Path appended to the base URL, e.g. `/audits`
    pub path: String,
    /// JSON body
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    /// 4xx / 5xx
    pub fn is_error_status(&self) -> bool {
        self.status >= 400
    }

    /// Parse the body as JSON
    pub fn json_body(&self) -> Result<Value> {
        serde_json::from_str(&self.body).map_err(|e| AuditError::MalformedResponse {
            details: e.to_string(),
        })
    }
}

/// Capability to deliver one request to the audit service
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request. Fails only on transport-level problems; any HTTP
    /// status, including 5xx, comes back as a response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}
