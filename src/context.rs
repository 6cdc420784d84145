//! Context enrichment
//!
//! Fills the implicit fields of an event before it is sent. Layers, lowest
//! precedence first, merged key by key (shallow):
//!
//! 1. ambient defaults: service identity, timestamp, severity `info`, and the
//!    current [`RequestContext`] if one is in scope
//! 2. the client's `default_metadata` (correlation / request / session ids live here)
//! 3. the fields the caller set on the event
//!
//! Nothing is validated here.

use std::future::Future;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::config::AuditClientConfig;
use crate::event::{Attributes, AuditEvent, Severity};

tokio::task_local! {
    static REQUEST_CONTEXT: RequestContext;
}

/// Identity and defaults a client stamps on every event
///
/// Owned by value: deriving a client clones this, so parent and child never
/// share the metadata map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientIdentity {
    pub base_url: String,
    pub service_name: String,
    pub service_version: String,
    pub environment: String,
    #[serde(rename = "async")]
    pub async_dispatch: bool,
    pub enabled: bool,
    pub default_metadata: Attributes,
}

impl From<&AuditClientConfig> for ClientIdentity {
    fn from(config: &AuditClientConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            service_name: config.service_name.clone(),
            service_version: config.service_version.clone(),
            environment: config.environment.clone(),
            async_dispatch: config.async_dispatch,
            enabled: config.enabled,
            default_metadata: config.default_metadata.clone(),
        }
    }
}

impl ClientIdentity {
    /// Copy of `self` with one more default metadata entry
    pub fn extended(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut derived = self.clone();
        derived.default_metadata.insert(key.into(), value.into());
        derived
    }

    /// Enrich a raw event with ambient fields and default metadata.
    ///
    /// Caller-set fields always win, so preparing an already complete event
    /// leaves every one of its fields as it was.
    ///
    /// An unset typed field (`None`, empty `metadata`) counts as absent, so a
    /// caller cannot blank out a default with null or `{}`. Untyped keys are
    /// different: an explicit null in `extra` replaces the default.
    pub fn prepare(&self, raw: AuditEvent) -> AuditEvent {
        let ambient = RequestContext::current().unwrap_or_default();

        let mut event = AuditEvent {
            service_name: Some(self.service_name.clone()),
            service_version: Some(self.service_version.clone()),
            environment: Some(self.environment.clone()),
            event_timestamp: Some(now_iso8601()),
            ip_address: ambient.ip_address,
            user_agent: ambient.user_agent,
            url: ambient.url,
            severity: Some(Severity::Info),
            ..Default::default()
        };

        for (key, value) in &self.default_metadata {
            event.apply(key.clone(), value.clone());
        }

        event.overlay(raw);

        if event.severity.is_none() {
            event.severity = Some(Severity::Info);
        }

        event
    }
}

/// Per-request fields picked up by enrichment while in scope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub url: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Run `fut` with this context visible to every event prepared inside it
    pub async fn scope<F: Future>(self, fut: F) -> F::Output {
        REQUEST_CONTEXT.scope(self, fut).await
    }

    /// Synchronous variant of [`RequestContext::scope`]
    pub fn sync_scope<R>(self, f: impl FnOnce() -> R) -> R {
        REQUEST_CONTEXT.sync_scope(self, f)
    }

    /// The context in scope, if any
    pub fn current() -> Option<RequestContext> {
        REQUEST_CONTEXT.try_with(|ctx| ctx.clone()).ok()
    }
}

fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
