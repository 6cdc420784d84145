//! Audit Client - best-effort delivery of audit events to a central audit service
//!
//! Events are enriched with service identity, request context and default
//! metadata, then sent synchronously or fire-and-forget. Public operations
//! never fail: delivery problems are logged and folded into a `bool`,
//! [`BatchResult`] or [`HealthReport`].
//!
//! ```no_run
//! use audit_client::{AuditClient, AuditClientConfig, AuditEvent, Severity};
//!
//! # async fn demo() -> audit_client::Result<()> {
//! let client = AuditClient::new(AuditClientConfig::from_env())?;
//! let request_client = client.with_correlation("c-123");
//!
//! request_client
//!     .log(AuditEvent::new("user_login").with_user(42).with_severity(Severity::Info))
//!     .await;
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod batch;
pub mod capture;
pub mod client;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod health;
pub mod transport;

pub use batch::BatchResult;
pub use capture::{
    capture_change, is_suppressed, without_auditing, without_auditing_async, AuditObserver,
    Capturable, ChangeSet, EntityAuditConfig, Lifecycle,
};
pub use client::AuditClient;
pub use config::AuditClientConfig;
pub use context::{ClientIdentity, RequestContext};
pub use error::{AuditError, FixSuggestion, Result};
pub use event::{Attributes, AuditEvent, Severity};
pub use health::HealthReport;
pub use transport::{MockTransport, ReqwestTransport, RetryPolicy, Transport};
