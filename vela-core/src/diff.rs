//! Change detection between desired and previously observed state
//!
//! The change set separates three buckets: in-place updatable attributes,
//! attributes whose change forces replacement, and externally-reconciled tag
//! metadata. Update requests are built from the first bucket only.

use crate::resource::{Record, RemoteState};
use crate::schema::ResourceSchema;

/// Attribute-level difference between a record and the last observed state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    /// Changed mutable attributes, safe to send in an update request
    pub changed: Vec<String>,
    /// Changed force-new attributes; the resource must be replaced instead
    pub replaced: Vec<String>,
    /// Tag metadata differs (reconciled by the external tag collaborator)
    pub tags_changed: bool,
}

impl ChangeSet {
    /// Compute the difference between desired and previous state
    ///
    /// Computed attributes are the server's to change and never diffed.
    /// Attributes absent from the previous state count as changed.
    pub fn compute(schema: &ResourceSchema, desired: &Record, previous: &RemoteState) -> Self {
        let mut change_set = ChangeSet::default();

        for (name, value) in &desired.attributes {
            let Some(attr) = schema.attributes.get(name) else {
                continue;
            };
            if attr.computed {
                continue;
            }

            let differs = previous.attributes.get(name) != Some(value);
            if !differs {
                continue;
            }

            if attr.tag_metadata {
                change_set.tags_changed = true;
            } else if attr.force_new {
                change_set.replaced.push(name.clone());
            } else {
                change_set.changed.push(name.clone());
            }
        }

        change_set.changed.sort();
        change_set.replaced.sort();
        change_set
    }

    /// No difference at all
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.replaced.is_empty() && !self.tags_changed
    }

    /// The only difference is tag metadata; no remote call is warranted
    pub fn is_tags_only(&self) -> bool {
        self.changed.is_empty() && self.replaced.is_empty() && self.tags_changed
    }

    /// An immutable attribute changed; destroy-and-recreate is required
    pub fn requires_replace(&self) -> bool {
        !self.replaced.is_empty()
    }
}
