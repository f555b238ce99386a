//! Core aggregation types: keys, resources and event classification

use serde::{Deserialize, Serialize};

/// Event types that take part in aggregation (anything else is forwarded)
pub const DOCUMENT_CREATED: &str = "documentCreated";
pub const DOCUMENT_CREATED_BY_COPY: &str = "documentCreatedByCopy";
pub const DOCUMENT_MODIFIED: &str = "documentModified";
pub const DOCUMENT_SECURITY_UPDATED: &str = "documentSecurityUpdated";
pub const DOCUMENT_WAITING_PUBLICATION: &str = "documentWaitingPublication";
pub const DOCUMENT_TAG_UPDATED: &str = "documentTagUpdated";
pub const ABOUT_TO_REMOVE: &str = "aboutToRemove";

/// Resource type of an administrative tagging relation document
pub const TAGGING_RESOURCE_TYPE: &str = "Tagging";

/// Composite key of every per-window map: (actor, scope)
///
/// `scope` is a parent folder path for document merging and a resource id
/// for tag aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AggregationKey {
    pub actor: String,
    pub scope: String,
}

impl AggregationKey {
    pub fn new(actor: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            scope: scope.into(),
        }
    }
}

impl std::fmt::Display for AggregationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.actor, self.scope)
    }
}

/// What the event source knows about the affected resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub id: String,
    #[serde(default)]
    pub version_series_id: Option<String>,
    pub doc_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
    /// Source reference of a tagging relation (the tagged document)
    #[serde(default)]
    pub relation_source: Option<String>,
}

impl ResourceDescriptor {
    /// Stable id across versions, falling back to the plain id
    pub fn series_id(&self) -> &str {
        self.version_series_id.as_deref().unwrap_or(&self.id)
    }
}

/// Tag edit carried by a tagging relation event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagOp {
    Add,
    Remove,
    /// Relation touched without a net add/remove (only the timer moves)
    Touch,
}

/// Routing decision for one incoming event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    /// Outside the allow-list, forwarded without touching any window
    Passthrough,
    /// Create/copy/modify/security events, debounced per resource
    Update,
    /// Publication requests, debounced per resource in their own table
    Publication,
    /// Administrative tagging relation created or removed
    TagRelation(TagOp),
    /// Generic "tags updated" event without per-tag detail
    TagUpdate,
}

impl EventCategory {
    pub fn classify(event_type: &str, resource_type: &str) -> Self {
        if resource_type == TAGGING_RESOURCE_TYPE {
            let op = match event_type {
                DOCUMENT_CREATED => TagOp::Add,
                ABOUT_TO_REMOVE => TagOp::Remove,
                _ => TagOp::Touch,
            };
            return EventCategory::TagRelation(op);
        }

        match event_type {
            DOCUMENT_TAG_UPDATED => EventCategory::TagUpdate,
            DOCUMENT_WAITING_PUBLICATION => EventCategory::Publication,
            DOCUMENT_CREATED
            | DOCUMENT_CREATED_BY_COPY
            | DOCUMENT_MODIFIED
            | DOCUMENT_SECURITY_UPDATED => EventCategory::Update,
            _ => EventCategory::Passthrough,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_allow_list() {
        assert_eq!(EventCategory::classify("documentCreated", "File"), EventCategory::Update);
        assert_eq!(EventCategory::classify("documentCreatedByCopy", "Note"), EventCategory::Update);
        assert_eq!(EventCategory::classify("documentModified", "File"), EventCategory::Update);
        assert_eq!(EventCategory::classify("documentSecurityUpdated", "Folder"), EventCategory::Update);
        assert_eq!(
            EventCategory::classify("documentWaitingPublication", "File"),
            EventCategory::Publication
        );
        assert_eq!(EventCategory::classify("documentTagUpdated", "File"), EventCategory::TagUpdate);
        assert_eq!(EventCategory::classify("commentAdded", "File"), EventCategory::Passthrough);
        assert_eq!(EventCategory::classify("aboutToRemove", "File"), EventCategory::Passthrough);
    }

    #[test]
    fn test_classify_tagging_relation_ignores_event_allow_list() {
        assert_eq!(
            EventCategory::classify("documentCreated", "Tagging"),
            EventCategory::TagRelation(TagOp::Add)
        );
        assert_eq!(
            EventCategory::classify("aboutToRemove", "Tagging"),
            EventCategory::TagRelation(TagOp::Remove)
        );
        assert_eq!(
            EventCategory::classify("documentModified", "Tagging"),
            EventCategory::TagRelation(TagOp::Touch)
        );
    }

    #[test]
    fn test_series_id_falls_back_to_id() {
        let mut resource = ResourceDescriptor {
            id: "doc-1".to_string(),
            doc_type: "File".to_string(),
            ..Default::default()
        };
        assert_eq!(resource.series_id(), "doc-1");

        resource.version_series_id = Some("series-1".to_string());
        assert_eq!(resource.series_id(), "series-1");
    }
}
