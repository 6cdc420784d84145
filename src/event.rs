//! Audit event payload
//!
//! - `AuditEvent`: what gets POSTed to `/audits`, built by callers and
//!   completed by enrichment
//! - `Severity`: info / warning / error
//! - `Attributes`: string-keyed JSON map used for metadata and snapshots

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Attribute / metadata map
pub type Attributes = Map<String, Value>;

/// Performance events slower than this are warnings
pub const PERFORMANCE_WARNING_SECS: f64 = 5.0;

/// Performance events slower than this are errors
pub const PERFORMANCE_ERROR_SECS: f64 = 10.0;

/// Parsed the same way everywhere: `FromStr`, CLI flags and deserialization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// Severity of a timed operation
    ///
    /// `<= 5.0` info, `<= 10.0` warning, anything slower is an error.
    pub fn for_duration(duration_secs: f64) -> Self {
        if duration_secs > PERFORMANCE_ERROR_SECS {
            Severity::Error
        } else if duration_secs > PERFORMANCE_WARNING_SECS {
            Severity::Warning
        } else {
            Severity::Info
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            other => Err(format!(
                "unknown severity '{}' (expected info, warning, error)",
                other
            )),
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = String;

    fn try_from(value: String) -> Result<Self, <Severity as TryFrom<String>>::Error> {
        value.parse()
    }
}

/// A single audit record
///
/// Optional fields are omitted from the wire payload when absent. Keys the
/// struct doesn't model (`correlation_id`, `request_id`, custom default
/// metadata) live in `extra` and are flattened into the top-level object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    #[serde(default)]
    pub event: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auditable_type: Option<String>,

    /// Entity key; integer or string depending on the entity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auditable_id: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_values: Option<Attributes>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_values: Option<Attributes>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Attributes,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// ISO-8601, UTC
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_timestamp: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(flatten)]
    pub extra: Attributes,
}

impl AuditEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            ..Default::default()
        }
    }

    pub fn with_action_type(mut self, action_type: impl Into<String>) -> Self {
        self.action_type = Some(action_type.into());
        self
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_user_type(mut self, user_type: impl Into<String>) -> Self {
        self.user_type = Some(user_type.into());
        self
    }

    pub fn with_auditable(mut self, auditable_type: impl Into<String>, id: impl Into<Value>) -> Self {
        self.auditable_type = Some(auditable_type.into());
        self.auditable_id = Some(id.into());
        self
    }

    pub fn with_old_values(mut self, values: Attributes) -> Self {
        self.old_values = Some(values);
        self
    }

    pub fn with_new_values(mut self, values: Attributes) -> Self {
        self.new_values = Some(values);
        self
    }

    /// Replace the metadata map
    pub fn with_metadata(mut self, metadata: Attributes) -> Self {
        self.metadata = metadata;
        self
    }

    /// Add a single metadata entry
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Set a top-level field by wire name
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.apply(key.into(), value.into());
        self
    }

    /// Resolved severity (info when unset)
    pub fn severity(&self) -> Severity {
        self.severity.unwrap_or_default()
    }

    /// Wire payload, used for diagnostics
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Set one top-level key, routing known keys into their typed fields.
    ///
    /// `null` clears a typed field. A known key with the wrong JSON shape
    /// is dropped so the payload never carries the same key twice.
    pub fn apply(&mut self, key: String, value: Value) {
        match key.as_str() {
            "event" => match value {
                Value::String(s) => self.event = s,
                Value::Null => self.event.clear(),
                other => drop_malformed(&key, &other),
            },
            "action_type" => set_string(&mut self.action_type, &key, value),
            "user_type" => set_string(&mut self.user_type, &key, value),
            "auditable_type" => set_string(&mut self.auditable_type, &key, value),
            "service_name" => set_string(&mut self.service_name, &key, value),
            "service_version" => set_string(&mut self.service_version, &key, value),
            "environment" => set_string(&mut self.environment, &key, value),
            "event_timestamp" => set_string(&mut self.event_timestamp, &key, value),
            "ip_address" => set_string(&mut self.ip_address, &key, value),
            "user_agent" => set_string(&mut self.user_agent, &key, value),
            "url" => set_string(&mut self.url, &key, value),
            "user_id" => match value {
                Value::Null => self.user_id = None,
                ref v if v.as_i64().is_some() => self.user_id = v.as_i64(),
                other => drop_malformed(&key, &other),
            },
            "auditable_id" => {
                self.auditable_id = if value.is_null() { None } else { Some(value) };
            }
            "old_values" => set_object(&mut self.old_values, &key, value),
            "new_values" => set_object(&mut self.new_values, &key, value),
            "metadata" => match value {
                Value::Object(map) => self.metadata = map,
                Value::Null => self.metadata.clear(),
                other => drop_malformed(&key, &other),
            },
            "severity" => match value {
                Value::String(ref s) => match s.parse() {
                    Ok(severity) => self.severity = Some(severity),
                    Err(_) => drop_malformed(&key, &value),
                },
                Value::Null => self.severity = None,
                other => drop_malformed(&key, &other),
            },
            _ => {
                self.extra.insert(key, value);
            }
        }
    }

    /// Lay `top` over `self`: every field `top` carries wins.
    pub fn overlay(&mut self, top: AuditEvent) {
        if !top.event.is_empty() {
            self.event = top.event;
        }
        overlay_opt(&mut self.action_type, top.action_type);
        overlay_opt(&mut self.user_id, top.user_id);
        overlay_opt(&mut self.user_type, top.user_type);
        overlay_opt(&mut self.auditable_type, top.auditable_type);
        overlay_opt(&mut self.auditable_id, top.auditable_id);
        overlay_opt(&mut self.old_values, top.old_values);
        overlay_opt(&mut self.new_values, top.new_values);
        if !top.metadata.is_empty() {
            self.metadata = top.metadata;
        }
        overlay_opt(&mut self.severity, top.severity);
        overlay_opt(&mut self.service_name, top.service_name);
        overlay_opt(&mut self.service_version, top.service_version);
        overlay_opt(&mut self.environment, top.environment);
        overlay_opt(&mut self.event_timestamp, top.event_timestamp);
        overlay_opt(&mut self.ip_address, top.ip_address);
        overlay_opt(&mut self.user_agent, top.user_agent);
        overlay_opt(&mut self.url, top.url);
        for (key, value) in top.extra {
            self.apply(key, value);
        }
    }
}

impl From<&str> for AuditEvent {
    fn from(event: &str) -> Self {
        AuditEvent::new(event)
    }
}

fn overlay_opt<T>(slot: &mut Option<T>, top: Option<T>) {
    if top.is_some() {
        *slot = top;
    }
}

fn set_string(slot: &mut Option<String>, key: &str, value: Value) {
    match value {
        Value::String(s) => *slot = Some(s),
        Value::Null => *slot = None,
        other => drop_malformed(key, &other),
    }
}

fn set_object(slot: &mut Option<Attributes>, key: &str, value: Value) {
    match value {
        Value::Object(map) => *slot = Some(map),
        Value::Null => *slot = None,
        other => drop_malformed(key, &other),
    }
}

fn drop_malformed(key: &str, value: &Value) {
    debug!(field = key, value = %value, "Dropping audit field with unexpected shape");
}
