//! # Change Capture
//!
//! Derives audit payloads from entity lifecycle events.
//!
//! - [`capture_change`] - old/new diff for create / update / delete
//! - [`Capturable`] - what an entity exposes to be audited
//! - [`AuditObserver`] - lifecycle subscriber, registered per entity type
//! - [`without_auditing`] - scope in which no change is emitted
//!
//! Only attributes in the allowlist and not in the exclusion list ever appear
//! in a [`ChangeSet`]. An update that touches none of them yields no change
//! set at all, and no audit call is made.

mod entity;
mod observer;
mod suppress;

pub use entity::Capturable;
pub use observer::{AuditObserver, EntityAuditConfig};
pub use suppress::{is_suppressed, without_auditing, without_auditing_async};

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;

use crate::event::Attributes;

/// Entity lifecycle notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Created,
    Updated,
    Deleted,
}

impl Lifecycle {
    /// Event name sent to the audit service
    pub fn event_name(&self) -> &'static str {
        match self {
            Lifecycle::Created => "created",
            Lifecycle::Updated => "updated",
            Lifecycle::Deleted => "deleted",
        }
    }

    pub fn action_type(&self) -> &'static str {
        match self {
            Lifecycle::Created => "CREATED",
            Lifecycle::Updated => "UPDATED",
            Lifecycle::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

/// Old/new values of the audited attributes
///
/// Created: only `new_values`. Deleted: only `old_values`.
/// Updated: both, restricted to the changed keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub old_values: Option<Attributes>,
    pub new_values: Option<Attributes>,
}

/// Compute the audit diff for a lifecycle event.
///
/// Returns `None` for an update with no audited attribute changed. Create and
/// delete always produce a change set, possibly with an empty map. Null
/// attributes are left out of create/delete snapshots.
pub fn capture_change<A, E>(
    lifecycle: Lifecycle,
    prior: &Attributes,
    current: &Attributes,
    auditable: &[A],
    excluded: &[E],
) -> Option<ChangeSet>
where
    A: AsRef<str>,
    E: AsRef<str>,
{
    let excluded: HashSet<&str> = excluded.iter().map(|e| e.as_ref()).collect();
    let audited = auditable
        .iter()
        .map(|a| a.as_ref())
        .filter(|attr| !excluded.contains(attr));

    match lifecycle {
        Lifecycle::Created => Some(ChangeSet {
            old_values: None,
            new_values: Some(snapshot(current, audited)),
        }),
        Lifecycle::Deleted => Some(ChangeSet {
            old_values: Some(snapshot(prior, audited)),
            new_values: None,
        }),
        Lifecycle::Updated => {
            let mut old_values = Attributes::new();
            let mut new_values = Attributes::new();

            for attr in audited {
                let before = prior.get(attr);
                let after = current.get(attr);
                if before != after {
                    old_values.insert(attr.to_string(), before.cloned().unwrap_or(Value::Null));
                    new_values.insert(attr.to_string(), after.cloned().unwrap_or(Value::Null));
                }
            }

            if new_values.is_empty() {
                return None;
            }

            Some(ChangeSet {
                old_values: Some(old_values),
                new_values: Some(new_values),
            })
        }
    }
}

fn snapshot<'a>(source: &Attributes, attrs: impl Iterator<Item = &'a str>) -> Attributes {
    attrs
        .filter_map(|attr| match source.get(attr) {
            Some(value) if !value.is_null() => Some((attr.to_string(), value.clone())),
            _ => None,
        })
        .collect()
}
