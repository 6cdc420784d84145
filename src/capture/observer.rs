//! Lifecycle subscriber for entity auditing
//!
//! The persistence layer calls [`AuditObserver::observe`] after each
//! create / update / delete. Only entity types registered with the observer
//! are audited; everything else passes through untouched.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use serde_json::{json, Value};
use tracing::debug;

use super::{capture_change, is_suppressed, Capturable, Lifecycle};
use crate::client::AuditClient;
use crate::config::ModelAuditing;
use crate::event::{Attributes, AuditEvent};

static CAMEL_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap());
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\-]+").unwrap());

/// Per-type overrides given at registration
///
/// Each list, when set, wins over the entity's own declaration and the
/// configured default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityAuditConfig {
    pub auditable: Option<Vec<String>>,
    pub excluded: Option<Vec<String>>,
}

impl EntityAuditConfig {
    pub fn auditable<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auditable = Some(attrs.into_iter().map(Into::into).collect());
        self
    }

    pub fn excluded<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded = Some(attrs.into_iter().map(Into::into).collect());
        self
    }
}

pub struct AuditObserver {
    client: AuditClient,
    enabled: bool,
    default_excluded: Vec<String>,
    registry: RwLock<HashMap<String, EntityAuditConfig>>,
}

impl AuditObserver {
    pub fn new(client: AuditClient, settings: &ModelAuditing) -> Self {
        Self {
            client,
            enabled: settings.enabled,
            default_excluded: settings.exclude_attributes.clone(),
            registry: RwLock::new(HashMap::new()),
        }
    }

    /// Audit an entity type with its own attribute declarations
    pub fn register(&self, auditable_type: impl Into<String>) {
        self.register_with(auditable_type, EntityAuditConfig::default());
    }

    pub fn register_with(&self, auditable_type: impl Into<String>, config: EntityAuditConfig) {
        let auditable_type = auditable_type.into();
        debug!(auditable_type = %auditable_type, "Entity type registered for auditing");
        self.registry.write().insert(auditable_type, config);
    }

    pub fn is_registered(&self, auditable_type: &str) -> bool {
        self.registry.read().contains_key(auditable_type)
    }

    /// Model auditing switched on and the client enabled
    pub fn is_active(&self) -> bool {
        self.enabled && self.client.is_enabled()
    }

    /// Handle a lifecycle notification.
    ///
    /// Returns `true` when nothing had to be sent (unregistered type,
    /// suppressed scope, auditing off, update without audited changes),
    /// otherwise the outcome of [`AuditClient::log`].
    pub async fn observe(&self, lifecycle: Lifecycle, entity: &dyn Capturable) -> bool {
        let auditable_type = entity.auditable_type();

        let Some(registration) = self.registry.read().get(&auditable_type).cloned() else {
            return true;
        };

        if !self.is_active() || is_suppressed() {
            debug!(auditable_type = %auditable_type, %lifecycle, "Entity auditing skipped");
            return true;
        }

        let excluded = registration
            .excluded
            .or_else(|| entity.excluded_attributes())
            .unwrap_or_else(|| self.default_excluded.clone());
        let auditable = registration
            .auditable
            .or_else(|| entity.auditable_attributes())
            .unwrap_or_else(|| {
                entity
                    .fillable()
                    .into_iter()
                    .filter(|attr| !excluded.contains(attr))
                    .collect()
            });

        let prior = entity.prior_snapshot();
        let current = entity.current_snapshot();

        let Some(change) = capture_change(lifecycle, &prior, &current, &auditable, &excluded)
        else {
            debug!(auditable_type = %auditable_type, "No audited attribute changed");
            return true;
        };

        let event = AuditEvent {
            event: lifecycle.event_name().to_string(),
            action_type: Some(lifecycle.action_type().to_string()),
            auditable_type: Some(auditable_type),
            auditable_id: entity.auditable_id(),
            old_values: change.old_values,
            new_values: change.new_values,
            metadata: entity_metadata(entity, Attributes::new()),
            ..Default::default()
        };

        self.client.log(event).await
    }

    /// Log a named domain event against an entity.
    ///
    /// Skipped inside a suppressed scope. Does not require registration.
    pub async fn log_custom_event(
        &self,
        entity: &dyn Capturable,
        event: &str,
        old_values: Option<Attributes>,
        new_values: Option<Attributes>,
        metadata: Attributes,
    ) -> bool {
        if is_suppressed() {
            debug!(event = %event, "Custom entity event suppressed");
            return true;
        }

        let mut metadata = entity_metadata(entity, metadata);
        metadata.insert("custom_event".to_string(), json!(true));

        let event = AuditEvent {
            event: event.to_string(),
            action_type: Some(screaming_snake(event)),
            auditable_type: Some(entity.auditable_type()),
            auditable_id: entity.auditable_id(),
            old_values,
            new_values,
            metadata,
            ..Default::default()
        };

        self.client.log(event).await
    }
}

fn entity_metadata(entity: &dyn Capturable, mut metadata: Attributes) -> Attributes {
    metadata.insert("model".to_string(), Value::String(entity.model_name()));
    metadata.insert("table".to_string(), Value::String(entity.table()));
    metadata
}

/// `userPromoted` / `user promoted` / `user-promoted` -> `USER_PROMOTED`
fn screaming_snake(name: &str) -> String {
    let split = CAMEL_BOUNDARY.replace_all(name.trim(), "${1}_${2}");
    SEPARATORS.replace_all(&split, "_").to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditClientConfig;
    use crate::transport::MockTransport;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    struct Post {
        prior: Attributes,
        current: Attributes,
    }

    impl Capturable for Post {
        fn auditable_type(&self) -> String {
            "blog::Post".into()
        }

        fn auditable_id(&self) -> Option<Value> {
            Some(json!(42))
        }

        fn table(&self) -> String {
            "posts".into()
        }

        fn fillable(&self) -> Vec<String> {
            vec!["title".into(), "body".into(), "updated_at".into()]
        }

        fn prior_snapshot(&self) -> Attributes {
            self.prior.clone()
        }

        fn current_snapshot(&self) -> Attributes {
            self.current.clone()
        }
    }

    fn attrs(value: Value) -> Attributes {
        match value {
            Value::Object(map) => map,
            _ => Attributes::new(),
        }
    }

    fn observer(mock: &MockTransport) -> AuditObserver {
        let config = AuditClientConfig::default().with_async(false);
        let client = AuditClient::with_transport(&config, Arc::new(mock.clone()));
        AuditObserver::new(client, &config.model_auditing)
    }

    #[test]
    fn test_screaming_snake() {
        assert_eq!(screaming_snake("userPromoted"), "USER_PROMOTED");
        assert_eq!(screaming_snake("UserPromoted"), "USER_PROMOTED");
        assert_eq!(screaming_snake("password reset"), "PASSWORD_RESET");
        assert_eq!(screaming_snake("already_snake"), "ALREADY_SNAKE");
        assert_eq!(screaming_snake("post-published"), "POST_PUBLISHED");
    }

    #[tokio::test]
    async fn test_unregistered_type_is_ignored() {
        let mock = MockTransport::new();
        let observer = observer(&mock);
        let post = Post {
            prior: Attributes::new(),
            current: attrs(json!({"title": "Hi"})),
        };

        assert!(!observer.is_registered("blog::Post"));
        assert!(observer.observe(Lifecycle::Created, &post).await);
        assert_eq!(mock.request_count(), 0);

        observer.register("blog::Post");
        assert!(observer.is_registered("blog::Post"));
    }

    #[tokio::test]
    async fn test_created_uses_fillable_minus_default_exclusions() {
        let mock = MockTransport::new();
        let observer = observer(&mock);
        observer.register("blog::Post");
        let post = Post {
            prior: Attributes::new(),
            current: attrs(json!({"title": "Hi", "body": "text", "updated_at": "T", "id": 42})),
        };

        assert!(observer.observe(Lifecycle::Created, &post).await);

        let body = mock.last_request().unwrap().body.unwrap();
        assert_eq!(body["event"], "created");
        assert_eq!(body["action_type"], "CREATED");
        assert_eq!(body["auditable_type"], "blog::Post");
        assert_eq!(body["auditable_id"], 42);
        assert_eq!(body["new_values"], json!({"title": "Hi", "body": "text"}));
        assert!(body.get("old_values").is_none());
        assert_eq!(body["metadata"]["model"], "Post");
        assert_eq!(body["metadata"]["table"], "posts");
    }

    #[tokio::test]
    async fn test_registration_override_wins() {
        let mock = MockTransport::new();
        let observer = observer(&mock);
        observer.register_with(
            "blog::Post",
            EntityAuditConfig::default()
                .auditable(["title", "body"])
                .excluded(["body"]),
        );
        let post = Post {
            prior: attrs(json!({"title": "A", "body": "x"})),
            current: attrs(json!({"title": "B", "body": "y"})),
        };

        assert!(observer.observe(Lifecycle::Updated, &post).await);

        let body = mock.last_request().unwrap().body.unwrap();
        assert_eq!(body["old_values"], json!({"title": "A"}));
        assert_eq!(body["new_values"], json!({"title": "B"}));
    }

    #[tokio::test]
    async fn test_model_auditing_switch_off() {
        let mock = MockTransport::new();
        let config = AuditClientConfig::default().with_async(false);
        let client = AuditClient::with_transport(&config, Arc::new(mock.clone()));
        let settings = ModelAuditing {
            enabled: false,
            ..Default::default()
        };
        let observer = AuditObserver::new(client, &settings);
        observer.register("blog::Post");

        let post = Post {
            prior: Attributes::new(),
            current: attrs(json!({"title": "Hi"})),
        };

        assert!(!observer.is_active());
        assert!(observer.observe(Lifecycle::Created, &post).await);
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_custom_event_shape() {
        let mock = MockTransport::new();
        let post = Post {
            prior: Attributes::new(),
            current: Attributes::new(),
        };

        let ok = observer(&mock)
            .log_custom_event(
                &post,
                "postPublished",
                None,
                Some(attrs(json!({"status": "published"}))),
                attrs(json!({"model": "spoofed", "channel": "web"})),
            )
            .await;

        assert!(ok);
        let body = mock.last_request().unwrap().body.unwrap();
        assert_eq!(body["event"], "postPublished");
        assert_eq!(body["action_type"], "POST_PUBLISHED");
        assert_eq!(body["metadata"]["model"], "Post");
        assert_eq!(body["metadata"]["channel"], "web");
        assert_eq!(body["metadata"]["custom_event"], true);
    }
}
