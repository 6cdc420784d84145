//! Audit client handle
//!
//! An `AuditClient` is an immutable identity plus a shared transport. It is
//! built once at start-up and passed to whoever needs it; `with_*` calls derive
//! new clients instead of mutating this one.
//!
//! Dispatch lives in sibling modules:
//! - [`crate::dispatch`]: `log`
//! - [`crate::batch`]: `log_batch`
//! - [`crate::actions`]: typed helpers (`log_user_action`, `log_auth`, ...)
//! - [`crate::health`]: `health_check`

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::config::AuditClientConfig;
use crate::context::ClientIdentity;
use crate::error::Result;
use crate::event::AuditEvent;
use crate::transport::{ReqwestTransport, Transport};

pub const CORRELATION_ID_KEY: &str = "correlation_id";
pub const REQUEST_ID_KEY: &str = "request_id";
pub const SESSION_ID_KEY: &str = "session_id";

#[derive(Clone)]
pub struct AuditClient {
    identity: ClientIdentity,
    transport: Arc<dyn Transport>,
}

impl AuditClient {
    /// Client with the production HTTP transport
    pub fn new(config: AuditClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(&config, Arc::new(transport)))
    }

    /// Defaults overlaid with `AUDIT_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(AuditClientConfig::from_env())
    }

    /// Client over any transport (tests, custom HTTP stacks)
    pub fn with_transport(config: &AuditClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            identity: ClientIdentity::from(config),
            transport,
        }
    }

    /// Derived client tagging every event with `correlation_id`
    pub fn with_correlation(&self, correlation_id: impl Into<String>) -> Self {
        self.derive(CORRELATION_ID_KEY, correlation_id.into())
    }

    /// Derived client tagging every event with `request_id`
    pub fn with_request(&self, request_id: impl Into<String>) -> Self {
        self.derive(REQUEST_ID_KEY, request_id.into())
    }

    /// Derived client tagging every event with `session_id`
    pub fn with_session(&self, session_id: impl Into<String>) -> Self {
        self.derive(SESSION_ID_KEY, session_id.into())
    }

    /// Derived client with one extra default metadata entry
    pub fn with_default_metadata(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.derive(key, value)
    }

    /// Derived client with auditing switched on or off
    pub fn with_enabled(&self, enabled: bool) -> Self {
        let mut identity = self.identity.clone();
        identity.enabled = enabled;
        Self {
            identity,
            transport: Arc::clone(&self.transport),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.identity.enabled
    }

    pub fn is_async(&self) -> bool {
        self.identity.async_dispatch
    }

    /// Identity and defaults this client stamps on events
    pub fn config(&self) -> &ClientIdentity {
        &self.identity
    }

    /// Enrich an event the way `log` would, without sending it
    pub fn prepare(&self, raw: AuditEvent) -> AuditEvent {
        self.identity.prepare(raw)
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub(crate) fn service_name(&self) -> &str {
        &self.identity.service_name
    }

    fn derive(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            identity: self.identity.extended(key, value),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl fmt::Debug for AuditClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditClient")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
