//! Audit service reachability probe

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::AuditClient;
use crate::transport::{HttpRequest, HEALTH_PATH};

const HEALTHY_STATUS: u16 = 200;

/// Result of `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    /// HTTP 200 from the health endpoint
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Transport failure, when the service couldn't be reached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    fn unreachable(error: impl Into<String>) -> Self {
        Self {
            healthy: false,
            service: None,
            timestamp: None,
            version: None,
            error: Some(error.into()),
        }
    }
}

impl AuditClient {
    /// Probe the audit service. Never fails.
    pub async fn health_check(&self) -> HealthReport {
        let response = match self.transport().send(HttpRequest::get(HEALTH_PATH)).await {
            Ok(response) => response,
            Err(e) => {
                warn!(service = %self.service_name(), error = %e, "Audit service health check failed");
                return HealthReport::unreachable(e.to_string());
            }
        };

        let body = response.json_body().unwrap_or(Value::Null);
        let field = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_string);

        let report = HealthReport {
            healthy: response.status == HEALTHY_STATUS,
            service: Some(field("service").unwrap_or_else(|| "unknown".to_string())),
            timestamp: field("timestamp"),
            version: field("version"),
            error: None,
        };

        debug!(healthy = report.healthy, status = response.status, "Audit service health checked");
        report
    }
}
