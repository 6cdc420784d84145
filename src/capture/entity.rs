//! What an entity exposes so its lifecycle can be audited

use serde_json::Value;

use crate::event::Attributes;

/// An entity whose lifecycle can be audited
///
/// Snapshots are full attribute maps; restriction to the audited set happens
/// in [`super::capture_change`], so implementors never filter themselves.
pub trait Capturable: Send + Sync {
    /// Fully qualified type name, e.g. `app::models::User`
    fn auditable_type(&self) -> String;

    /// Primary key, `None` before the entity is persisted
    fn auditable_id(&self) -> Option<Value>;

    /// Backing table or collection
    fn table(&self) -> String;

    /// Short type name, last path segment of [`Capturable::auditable_type`]
    fn model_name(&self) -> String {
        let full = self.auditable_type();
        full.rsplit("::").next().unwrap_or(&full).to_string()
    }

    /// Attributes open to bulk assignment; default source of the audited set
    fn fillable(&self) -> Vec<String> {
        Vec::new()
    }

    /// Explicit audited set, replacing `fillable` minus exclusions
    fn auditable_attributes(&self) -> Option<Vec<String>> {
        None
    }

    /// Explicit exclusion list, replacing the configured default
    fn excluded_attributes(&self) -> Option<Vec<String>> {
        None
    }

    /// Attribute values before the lifecycle event
    fn prior_snapshot(&self) -> Attributes;

    /// Attribute values after the lifecycle event
    fn current_snapshot(&self) -> Attributes;
}
