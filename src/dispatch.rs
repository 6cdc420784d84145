//! Single-event delivery
//!
//! `log` never fails and never panics. It returns `true` when the event was
//! accepted (sync: HTTP 201), handed off (fire-and-forget) or intentionally
//! skipped (client disabled), and `false` otherwise. Failures are reported
//! through `tracing`.

use tracing::{debug, error, instrument, warn};

use crate::client::AuditClient;
use crate::error::{AuditError, Result};
use crate::event::AuditEvent;
use crate::transport::{HttpRequest, EVENTS_PATH};

/// Status the audit service answers a stored event with
pub const CREATED: u16 = 201;

impl AuditClient {
    /// Send one audit event
    #[instrument(skip(self, raw), fields(service = %self.service_name()))]
    pub async fn log(&self, raw: impl Into<AuditEvent>) -> bool {
        if !self.is_enabled() {
            return true;
        }

        let raw = raw.into();
        let event = self.prepare(raw.clone());

        let outcome = if event.event.is_empty() {
            Err(AuditError::MissingEvent)
        } else if self.is_async() {
            self.dispatch_detached(&event)
        } else {
            self.dispatch_sync(&event).await
        };

        match outcome {
            Ok(()) => true,
            Err(e) => {
                error!(
                    service = %self.service_name(),
                    event = %raw.event,
                    error = %e,
                    data = %raw.to_value(),
                    "Failed to send audit log"
                );
                false
            }
        }
    }

    async fn dispatch_sync(&self, event: &AuditEvent) -> Result<()> {
        let request = HttpRequest::post(EVENTS_PATH, serde_json::to_value(event)?);
        let response = self.transport().send(request).await?;

        if response.status != CREATED {
            return Err(AuditError::RemoteRejection {
                status: response.status,
            });
        }

        debug!(event = %event.event, "Audit event stored");
        Ok(())
    }

    /// Hand the request to a detached task and return without waiting.
    ///
    /// Fails only if the request can't be handed off. The spawned task is not
    /// tracked: it dies with the runtime.
    fn dispatch_detached(&self, event: &AuditEvent) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| AuditError::NoRuntime)?;
        let request = HttpRequest::post(EVENTS_PATH, serde_json::to_value(event)?);
        let transport = self.transport().clone();
        let service = self.service_name().to_string();
        let name = event.event.clone();

        runtime.spawn(async move {
            match transport.send(request).await {
                Ok(response) if response.status == CREATED => {
                    debug!(service = %service, event = %name, "Audit event stored");
                }
                Ok(response) => {
                    warn!(
                        service = %service,
                        event = %name,
                        status = response.status,
                        "Async audit send rejected"
                    );
                }
                Err(e) => {
                    warn!(service = %service, event = %name, error = %e, "Async audit send failed");
                }
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditClientConfig;
    use crate::event::Severity;
    use crate::transport::{MockReply, MockTransport};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn client(mock: &MockTransport, async_dispatch: bool) -> AuditClient {
        let config = AuditClientConfig::default()
            .with_base_url("http://test-audit-service/api/v1")
            .with_service("test-service", "1.0.0")
            .with_environment("testing")
            .with_async(async_dispatch);
        AuditClient::with_transport(&config, Arc::new(mock.clone()))
    }

    #[tokio::test]
    async fn test_sync_created_is_success() {
        let mock = MockTransport::new();
        mock.queue_response(201, json!({"success": true, "data": {"id": 1}}));

        let ok = client(&mock, false)
            .log(AuditEvent::new("user_login").with_user(123).with_severity(Severity::Info))
            .await;

        assert!(ok);
        let request = mock.last_request().unwrap();
        assert_eq!(request.path, "/audits");
        let body = request.body.unwrap();
        assert_eq!(body["event"], "user_login");
        assert_eq!(body["user_id"], 123);
        assert_eq!(body["service_name"], "test-service");
    }

    #[tokio::test]
    async fn test_sync_other_statuses_fail() {
        for status in [200, 202, 204, 400, 422, 500, 503] {
            let mock = MockTransport::new();
            mock.queue_response(status, json!({"error": "nope"}));

            let ok = client(&mock, false).log("test_event").await;
            assert!(!ok, "status {status} should be a failure");
        }
    }

    #[tokio::test]
    async fn test_sync_transport_error_is_false() {
        let mock = MockTransport::new();
        mock.queue_network_error("Connection error");
        assert!(!client(&mock, false).log("test_event").await);

        mock.queue(MockReply::Timeout("read timed out".into()));
        assert!(!client(&mock, false).log("test_event").await);
    }

    #[tokio::test]
    async fn test_disabled_skips_transport() {
        let mock = MockTransport::new();
        mock.queue_network_error("must not be reached");
        let disabled = client(&mock, false).with_enabled(false);

        assert!(disabled.log("test_event").await);
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_event_name_is_not_sent() {
        let mock = MockTransport::new();

        assert!(!client(&mock, false).log(AuditEvent::default()).await);
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_async_returns_before_response() {
        let mock = MockTransport::new().with_default(MockReply::NetworkError("down".into()));

        let ok = client(&mock, true).log("fire_and_forget").await;
        assert!(ok);

        // the detached task still runs
        for _ in 0..50 {
            if mock.request_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(mock.request_count(), 1);
    }

    #[test]
    fn test_async_without_runtime_is_false() {
        let mock = MockTransport::new();
        let client = client(&mock, true);

        // no tokio runtime on this thread
        let ok = futures::executor::block_on(client.log("orphan"));

        assert!(!ok);
        assert_eq!(mock.request_count(), 0);
    }
}
