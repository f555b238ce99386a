//! ActivityStreams notification model
//!
//! The translation layer produces `Activity` values; the aggregation core
//! only reads a few fields (verb, object id and url) and synthesizes the
//! consolidated activities built here.

use crate::aggregation::types::ResourceDescriptor;
use serde::{Deserialize, Serialize};

/// Suffix the repository appends to document URLs
pub const VIEW_SUFFIX: &str = "/@view_documents";

pub const OBJECT_TYPE_PERSON: &str = "person";
pub const OBJECT_TYPE_COLLECTION: &str = "nuxeoCollection";
pub const OBJECT_TYPE_TAG: &str = "nuxeoTag";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ActivityObject {
    pub fn person(user_id: &str, display_name: &str) -> Self {
        Self {
            id: Some(user_id.to_string()),
            display_name: Some(display_name.to_string()),
            object_type: Some(OBJECT_TYPE_PERSON.to_string()),
            ..Default::default()
        }
    }

    /// Folder target for merged document activities
    pub fn folder(parent_path: &str) -> Self {
        Self {
            display_name: Some("Folder".to_string()),
            object_type: Some(OBJECT_TYPE_COLLECTION.to_string()),
            url: Some(format!("{}{}", parent_path, VIEW_SUFFIX)),
            ..Default::default()
        }
    }

    /// Synthetic "N documents" object; content lists the member ids
    pub fn document_collection(members: &[ActivityObject]) -> Self {
        let ids: Vec<&str> = members.iter().filter_map(|m| m.id.as_deref()).collect();

        Self {
            display_name: Some(format!("{} documents", members.len())),
            object_type: Some(OBJECT_TYPE_COLLECTION.to_string()),
            content: Some(ids.join(",")),
            ..Default::default()
        }
    }

    /// Tag list object: `Tag "a"` for one tag, `Tags (a, b)` for several
    pub fn tag_list(tags: &[String]) -> Self {
        let display_name = if tags.len() > 1 {
            format!("Tags ({})", tags.join(", "))
        } else {
            format!("Tag \"{}\"", tags.join(", "))
        };

        Self {
            display_name: Some(display_name),
            object_type: Some(OBJECT_TYPE_TAG.to_string()),
            ..Default::default()
        }
    }

    /// Document object as published to the feed
    ///
    /// `base_url` is the repository root (e.g. `http://host/nuxeo/`).
    pub fn document(resource: &ResourceDescriptor, base_url: &str) -> Self {
        let object_type = match resource.doc_type.as_str() {
            "File" => "Document".to_string(),
            other => other.to_string(),
        };

        let url = resource.path.as_ref().map(|path| {
            format!(
                "{}nxpath/{}{}{}",
                base_url,
                resource.repository.as_deref().unwrap_or("default"),
                path,
                VIEW_SUFFIX
            )
        });

        Self {
            id: Some(resource.series_id().to_string()),
            display_name: resource.title.clone(),
            object_type: Some(object_type),
            url,
            content: Some(format!(
                "type: {}\nname: {}",
                resource.doc_type,
                resource.name.as_deref().unwrap_or_default()
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub verb: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<ActivityObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<ActivityObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ActivityObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<ActivityObject>,
}

impl Activity {
    pub fn new(verb: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            ..Default::default()
        }
    }

    pub fn with_actor(mut self, actor: ActivityObject) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_object(mut self, object: ActivityObject) -> Self {
        self.object = Some(object);
        self
    }

    pub fn with_target(mut self, target: ActivityObject) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_generator(mut self, generator: Option<ActivityObject>) -> Self {
        self.generator = generator;
        self
    }
}

/// Parent folder of a document URL
///
/// Strips the view suffix and the leaf segment:
/// `http://h/nxpath/default/ws/a/doc/@view_documents` -> `http://h/nxpath/default/ws/a`.
/// Returns `None` when the URL lacks the suffix or a leaf segment.
pub fn parent_path(url: &str) -> Option<&str> {
    let end = url.find(VIEW_SUFFIX)?;
    let document_path = &url[..end];
    let leaf = document_path.rfind('/')?;
    Some(&document_path[..leaf])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_path_strips_suffix_and_leaf() {
        assert_eq!(
            parent_path("http://host/nuxeo/nxpath/default/ws/reports/q3.pdf/@view_documents"),
            Some("http://host/nuxeo/nxpath/default/ws/reports")
        );
        assert_eq!(parent_path("http://host/nuxeo/nxfile/default/abc/blobholder:0/q3.pdf"), None);
        assert_eq!(parent_path("doc/@view_documents"), None);
    }

    #[test]
    fn test_tag_list_display_names() {
        let single = ActivityObject::tag_list(&["finance".to_string()]);
        assert_eq!(single.display_name.as_deref(), Some("Tag \"finance\""));

        let several = ActivityObject::tag_list(&["finance".to_string(), "q3".to_string()]);
        assert_eq!(several.display_name.as_deref(), Some("Tags (finance, q3)"));
        assert_eq!(several.object_type.as_deref(), Some(OBJECT_TYPE_TAG));
    }

    #[test]
    fn test_collection_counts_members() {
        let members: Vec<ActivityObject> = (0..3)
            .map(|i| ActivityObject {
                id: Some(format!("doc-{}", i)),
                ..Default::default()
            })
            .collect();

        let activity = Activity::new("update").with_object(ActivityObject::document_collection(&members));
        let object = activity.object.as_ref().unwrap();

        assert_eq!(object.display_name.as_deref(), Some("3 documents"));
        assert_eq!(object.content.as_deref(), Some("doc-0,doc-1,doc-2"));
    }

    #[test]
    fn test_document_object_from_resource() {
        let resource = ResourceDescriptor {
            id: "abc".to_string(),
            version_series_id: Some("series-abc".to_string()),
            doc_type: "File".to_string(),
            name: Some("q3.pdf".to_string()),
            title: Some("Q3 report".to_string()),
            path: Some("/ws/reports/q3.pdf".to_string()),
            repository: Some("default".to_string()),
            relation_source: None,
        };

        let object = ActivityObject::document(&resource, "http://host/nuxeo/");
        assert_eq!(object.id.as_deref(), Some("series-abc"));
        assert_eq!(object.object_type.as_deref(), Some("Document"));
        assert_eq!(
            object.url.as_deref(),
            Some("http://host/nuxeo/nxpath/default/ws/reports/q3.pdf/@view_documents")
        );
        assert_eq!(object.content.as_deref(), Some("type: File\nname: q3.pdf"));
    }

    #[test]
    fn test_activity_serializes_camel_case_without_nulls() {
        let activity = Activity::new("add")
            .with_actor(ActivityObject::person("jdoe", "Jane Doe"))
            .with_object(ActivityObject::tag_list(&["finance".to_string()]));

        let json = serde_json::to_value(&activity).unwrap();
        assert_eq!(json["actor"]["displayName"], "Jane Doe");
        assert_eq!(json["actor"]["objectType"], "person");
        assert!(json.get("target").is_none());
        assert!(json["object"].get("url").is_none());
    }
}
