//! Batch submission
//!
//! All events go out in one `POST /audits/batch` request with body
//! `{"audits": [...]}`. The service answers
//! `{"success": bool, "data": {"created": [...], "errors": [...]}}`.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, instrument, warn};

use crate::client::AuditClient;
use crate::error::{AuditError, Result};
use crate::event::AuditEvent;
use crate::transport::{HttpRequest, HttpResponse, BATCH_PATH};

/// Outcome of a batch submission
///
/// Counts come from the service's response, never from the input size,
/// except on total failure where every input counts as an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    /// True only if the service says so
    pub success: bool,
    pub created: usize,
    pub errors: usize,
    /// Service's per-item outcome, passed through untouched
    pub details: Value,
}

impl BatchResult {
    fn disabled(count: usize) -> Self {
        Self {
            success: true,
            created: count,
            errors: 0,
            details: json!({"message": "Audit logging is disabled"}),
        }
    }

    fn total_failure(count: usize, error: &AuditError) -> Self {
        Self {
            success: false,
            created: 0,
            errors: count,
            details: json!({"error": error.to_string()}),
        }
    }

    /// Read counts from a response body; anything missing counts as zero.
    pub fn from_response_body(body: &Value) -> Self {
        let data = body.get("data");
        let count = |key: &str| {
            data.and_then(|d| d.get(key))
                .and_then(Value::as_array)
                .map_or(0, Vec::len)
        };

        Self {
            success: body.get("success").and_then(Value::as_bool).unwrap_or(false),
            created: count("created"),
            errors: count("errors"),
            details: data.cloned().unwrap_or_else(|| json!({})),
        }
    }

    /// Some items stored, some rejected
    pub fn is_partial(&self) -> bool {
        self.created > 0 && self.errors > 0
    }
}

impl AuditClient {
    /// Send several events in one request
    #[instrument(skip(self, events), fields(service = %self.service_name()))]
    pub async fn log_batch<I>(&self, events: I) -> BatchResult
    where
        I: IntoIterator,
        I::Item: Into<AuditEvent>,
    {
        let events: Vec<AuditEvent> = events.into_iter().map(Into::into).collect();
        let count = events.len();

        if !self.is_enabled() {
            return BatchResult::disabled(count);
        }

        let prepared: Vec<AuditEvent> = events.into_iter().map(|e| self.prepare(e)).collect();

        match self.submit_batch(prepared).await {
            Ok(response) => {
                let result = match response.json_body() {
                    Ok(body) => BatchResult::from_response_body(&body),
                    Err(e) => {
                        warn!(error = %e, status = response.status, "Unreadable batch response");
                        BatchResult::from_response_body(&Value::Null)
                    }
                };
                debug!(
                    created = result.created,
                    errors = result.errors,
                    success = result.success,
                    "Batch submitted"
                );
                result
            }
            Err(e) => {
                error!(
                    service = %self.service_name(),
                    count,
                    error = %e,
                    "Failed to send batch audit logs"
                );
                BatchResult::total_failure(count, &e)
            }
        }
    }

    /// POST the batch; an error status rejects the whole request
    async fn submit_batch(&self, prepared: Vec<AuditEvent>) -> Result<HttpResponse> {
        let body = json!({ "audits": prepared });
        let response = self
            .transport()
            .send(HttpRequest::post(BATCH_PATH, body))
            .await?;

        if response.is_error_status() {
            return Err(AuditError::RemoteRejection {
                status: response.status,
            });
        }

        Ok(response)
    }
}
