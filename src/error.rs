//! Error types with fix suggestions
//!
//! None of these escape the public dispatch operations (`log`, `log_batch`,
//! `health_check`); they are logged and folded into the returned value.
//! Constructors and config loading do return them.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuditError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum AuditError {
    // ─────────────────────────────────────────────────────────────
    // Transport failures (connection, DNS, timeout)
    // ─────────────────────────────────────────────────────────────
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Invalid endpoint URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("No async runtime available to dispatch the request")]
    NoRuntime,

    // ─────────────────────────────────────────────────────────────
    // Remote rejections
    // ─────────────────────────────────────────────────────────────
    #[error("Audit service rejected the request with status {status}")]
    RemoteRejection { status: u16 },

    #[error("Malformed response from audit service: {details}")]
    MalformedResponse { details: String },

    #[error("Audit event has no event name")]
    MissingEvent,

    // ─────────────────────────────────────────────────────────────
    // Construction / configuration
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AuditError {
    /// Transport-level failures the retry policy is allowed to repeat
    pub fn is_transient(&self) -> bool {
        matches!(self, AuditError::Network(_) | AuditError::Timeout(_))
    }
}

impl From<reqwest::Error> for AuditError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AuditError::Timeout(err.to_string())
        } else if err.is_decode() {
            AuditError::MalformedResponse {
                details: err.to_string(),
            }
        } else if err.is_builder() {
            AuditError::Config {
                reason: err.to_string(),
            }
        } else {
            AuditError::Network(err.to_string())
        }
    }
}

impl FixSuggestion for AuditError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            AuditError::Network(_) => {
                Some("Check AUDIT_SERVICE_URL and that the audit service is reachable")
            }
            AuditError::Timeout(_) => Some("Raise AUDIT_TIMEOUT or AUDIT_CONNECT_TIMEOUT"),
            AuditError::InvalidUrl { .. } => {
                Some("Use an absolute base URL, e.g. http://audit-service:8080/api/v1")
            }
            AuditError::NoRuntime => Some("Call the client from inside a tokio runtime"),
            AuditError::RemoteRejection { .. } => {
                Some("Check the API key and the event payload accepted by the service")
            }
            AuditError::MalformedResponse { .. } => {
                Some("Check that base_url points at the audit service API root")
            }
            AuditError::MissingEvent => Some("Set a non-empty event name"),
            AuditError::Config { .. } => Some("Check the audit client configuration values"),
            AuditError::Io(_) => Some("Check file path and permissions"),
            AuditError::Yaml(_) => Some("Check YAML syntax: indentation and quoting"),
            AuditError::Json(_) => Some("Check JSON syntax of the input"),
        }
    }
}
