//! Typed audit helpers
//!
//! Each helper builds the event shape the audit service expects for that
//! category, then goes through [`AuditClient::log`]. The builders are public
//! so the same shapes can be collected into a batch.
//!
//! Helper-owned metadata keys (`auth_event`, `system_event`, ...) override
//! caller metadata with the same name.

use serde_json::{json, Value};

use crate::client::AuditClient;
use crate::event::{Attributes, AuditEvent, Severity};

pub const ACTION_AUTH: &str = "AUTH";
pub const ACTION_SYSTEM: &str = "SYSTEM";
pub const ACTION_SECURITY: &str = "SECURITY";
pub const ACTION_PERFORMANCE: &str = "PERFORMANCE";

/// A user changed something; `action_type` is the upper-cased action
pub fn user_action(
    action: &str,
    user_id: i64,
    user_type: Option<&str>,
    old_values: Option<Attributes>,
    new_values: Option<Attributes>,
    metadata: Attributes,
    severity: Severity,
) -> AuditEvent {
    AuditEvent {
        event: action.to_string(),
        action_type: Some(action.to_uppercase()),
        user_id: Some(user_id),
        user_type: user_type.map(str::to_string),
        old_values,
        new_values,
        metadata,
        severity: Some(severity),
        ..Default::default()
    }
}

/// Login / logout / password events; failures are warnings
pub fn auth(
    event: &str,
    user_id: Option<i64>,
    user_type: Option<&str>,
    success: bool,
    metadata: Attributes,
) -> AuditEvent {
    AuditEvent {
        event: event.to_string(),
        action_type: Some(ACTION_AUTH.to_string()),
        user_id,
        user_type: user_type.map(str::to_string),
        severity: Some(if success {
            Severity::Info
        } else {
            Severity::Warning
        }),
        metadata: merged(
            metadata,
            [("success", json!(success)), ("auth_event", json!(event))],
        ),
        ..Default::default()
    }
}

pub fn system(event: &str, severity: Severity, metadata: Attributes) -> AuditEvent {
    AuditEvent {
        event: event.to_string(),
        action_type: Some(ACTION_SYSTEM.to_string()),
        severity: Some(severity),
        metadata: merged(metadata, [("system_event", json!(event))]),
        ..Default::default()
    }
}

/// Always a warning; `threat_type` is `null` when unknown
pub fn security(
    event: &str,
    user_id: Option<i64>,
    threat: Option<&str>,
    metadata: Attributes,
) -> AuditEvent {
    AuditEvent {
        event: event.to_string(),
        action_type: Some(ACTION_SECURITY.to_string()),
        user_id,
        severity: Some(Severity::Warning),
        metadata: merged(
            metadata,
            [("security_event", json!(event)), ("threat_type", json!(threat))],
        ),
        ..Default::default()
    }
}

/// Timed operation; severity from [`Severity::for_duration`]
pub fn performance(operation: &str, duration_secs: f64, metadata: Attributes) -> AuditEvent {
    AuditEvent {
        event: format!("performance_{}", operation),
        action_type: Some(ACTION_PERFORMANCE.to_string()),
        severity: Some(Severity::for_duration(duration_secs)),
        metadata: merged(
            metadata,
            [
                ("operation", json!(operation)),
                ("duration_seconds", json!(duration_secs)),
                ("performance_event", json!(true)),
            ],
        ),
        ..Default::default()
    }
}

fn merged<const N: usize>(mut metadata: Attributes, entries: [(&str, Value); N]) -> Attributes {
    for (key, value) in entries {
        metadata.insert(key.to_string(), value);
    }
    metadata
}

impl AuditClient {
    #[allow(clippy::too_many_arguments)]
    pub async fn log_user_action(
        &self,
        action: &str,
        user_id: i64,
        user_type: Option<&str>,
        old_values: Option<Attributes>,
        new_values: Option<Attributes>,
        metadata: Attributes,
        severity: Severity,
    ) -> bool {
        self.log(user_action(
            action, user_id, user_type, old_values, new_values, metadata, severity,
        ))
        .await
    }

    pub async fn log_auth(
        &self,
        event: &str,
        user_id: Option<i64>,
        user_type: Option<&str>,
        success: bool,
        metadata: Attributes,
    ) -> bool {
        self.log(auth(event, user_id, user_type, success, metadata))
            .await
    }

    pub async fn log_system(&self, event: &str, severity: Severity, metadata: Attributes) -> bool {
        self.log(system(event, severity, metadata)).await
    }

    pub async fn log_security(
        &self,
        event: &str,
        user_id: Option<i64>,
        threat: Option<&str>,
        metadata: Attributes,
    ) -> bool {
        self.log(security(event, user_id, threat, metadata)).await
    }

    pub async fn log_performance(
        &self,
        operation: &str,
        duration_secs: f64,
        metadata: Attributes,
    ) -> bool {
        self.log(performance(operation, duration_secs, metadata))
            .await
    }
}
