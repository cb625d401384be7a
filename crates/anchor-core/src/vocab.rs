//! ActivityStreams shapes served by the collection endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CoreError, Result};
use crate::types::CollectionShape;

/// JSON-LD context of every collection document
pub const ACTIVITY_STREAMS_CONTEXT: &str = "https://www.w3.org/ns/activitystreams";

/// Activity type names the node acts upon
pub mod activity_type {
    pub const FOLLOW: &str = "Follow";
    pub const LIKE: &str = "Like";
    pub const ANNOUNCE: &str = "Announce";
    pub const CREATE: &str = "Create";
}

/// `type` of a collection document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionKind {
    Collection,
    OrderedCollection,
    CollectionPage,
    OrderedCollectionPage,
}

impl CollectionShape {
    /// Type of the summary document
    pub fn summary_kind(self) -> CollectionKind {
        match self {
            CollectionShape::Unordered => CollectionKind::Collection,
            CollectionShape::Ordered => CollectionKind::OrderedCollection,
        }
    }

    /// Type of a page document
    pub fn page_kind(self) -> CollectionKind {
        match self {
            CollectionShape::Unordered => CollectionKind::CollectionPage,
            CollectionShape::Ordered => CollectionKind::OrderedCollectionPage,
        }
    }
}

/// An ActivityStreams activity.
///
/// Only the members the node interprets are typed; everything else is kept
/// verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Url>,

    #[serde(rename = "type")]
    pub kind: String,

    pub actor: Url,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Activity {
    /// Create an activity of the given type
    pub fn new(kind: impl Into<String>, actor: Url) -> Self {
        Self {
            context: Some(serde_json::Value::String(ACTIVITY_STREAMS_CONTEXT.to_string())),
            id: None,
            kind: kind.into(),
            actor,
            object: None,
            published: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Set the id
    pub fn with_id(mut self, id: Url) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the object to an IRI
    pub fn with_object_iri(mut self, object: &Url) -> Self {
        self.object = Some(serde_json::Value::String(object.to_string()));
        self
    }

    /// Set the published time
    pub fn with_published(mut self, published: DateTime<Utc>) -> Self {
        self.published = Some(published);
        self
    }

    /// IRI of the object, whether given as a bare IRI or as an embedded object's `id`
    pub fn object_iri(&self) -> Option<Url> {
        let raw = match self.object.as_ref()? {
            serde_json::Value::String(s) => s.as_str(),
            serde_json::Value::Object(obj) => obj.get("id")?.as_str()?,
            _ => return None,
        };
        Url::parse(raw).ok()
    }
}

/// An item of a collection page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollectionItem {
    Iri(Url),
    Activity(Box<Activity>),
}

/// Summary (non-paged) view of a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    #[serde(rename = "@context")]
    pub context: String,
    pub id: Url,
    #[serde(rename = "type")]
    pub kind: CollectionKind,
    pub total_items: u64,
    pub first: Url,
    pub last: Url,
}

impl CollectionSummary {
    pub fn new(shape: CollectionShape, id: Url, total_items: u64, first: Url, last: Url) -> Self {
        Self {
            context: ACTIVITY_STREAMS_CONTEXT.to_string(),
            id,
            kind: shape.summary_kind(),
            total_items,
            first,
            last,
        }
    }
}

/// One page of a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionPage {
    #[serde(rename = "@context")]
    pub context: String,
    pub id: Url,
    #[serde(rename = "type")]
    pub kind: CollectionKind,
    pub part_of: Url,
    pub total_items: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<CollectionItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordered_items: Option<Vec<CollectionItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Url>,
}

impl CollectionPage {
    /// Build a page; the shape decides whether entries land in `items` or `orderedItems`
    pub fn new(
        shape: CollectionShape,
        id: Url,
        part_of: Url,
        total_items: u64,
        entries: Vec<CollectionItem>,
    ) -> Self {
        let (items, ordered_items) = match shape {
            CollectionShape::Unordered => (Some(entries), None),
            CollectionShape::Ordered => (None, Some(entries)),
        };

        Self {
            context: ACTIVITY_STREAMS_CONTEXT.to_string(),
            id,
            kind: shape.page_kind(),
            part_of,
            total_items,
            items,
            ordered_items,
            prev: None,
            next: None,
        }
    }

    /// Set the neighbour links
    pub fn with_links(mut self, prev: Option<Url>, next: Option<Url>) -> Self {
        self.prev = prev;
        self.next = next;
        self
    }

    /// The page's entries regardless of shape
    pub fn entries(&self) -> &[CollectionItem] {
        self.items
            .as_deref()
            .or(self.ordered_items.as_deref())
            .unwrap_or(&[])
    }
}

/// IRI of a resource nested under `base`, one path segment per element.
///
/// Segments are percent-encoded, so an absolute IRI can be nested as a single
/// segment.
pub fn child_iri(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut iri = base.clone();
    iri.set_query(None);
    iri.set_fragment(None);
    iri.path_segments_mut()
        .map_err(|_| CoreError::InvalidIri(format!("'{}' cannot have path segments", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(iri)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn iri(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_unordered_page_serializes_items() {
        let page = CollectionPage::new(
            CollectionShape::Unordered,
            iri("https://a.example/followers?page=true&page-num=0"),
            iri("https://a.example/followers"),
            1,
            vec![CollectionItem::Iri(iri("https://b.example/services/anchor"))],
        );

        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["type"], "CollectionPage");
        assert_eq!(value["items"][0], "https://b.example/services/anchor");
        assert!(value.get("orderedItems").is_none());
        assert!(value.get("next").is_none());
    }

    #[test]
    fn test_ordered_page_serializes_ordered_items() {
        let page = CollectionPage::new(
            CollectionShape::Ordered,
            iri("https://a.example/outbox?page=true&page-num=0"),
            iri("https://a.example/outbox"),
            0,
            vec![],
        );

        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["type"], "OrderedCollectionPage");
        assert_eq!(value["orderedItems"], json!([]));
        assert!(page.entries().is_empty());
    }

    #[test]
    fn test_activity_keeps_unknown_members() {
        let raw = json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "id": "https://a.example/activities/1",
            "type": "Create",
            "actor": "https://a.example/services/anchor",
            "object": {"id": "https://a.example/anchors/1", "type": "AnchorEvent"},
            "to": ["https://b.example/services/anchor"]
        });

        let activity: Activity = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(activity.kind, "Create");
        assert_eq!(activity.object_iri(), Some(iri("https://a.example/anchors/1")));
        assert_eq!(activity.extra["to"], raw["to"]);
        assert_eq!(serde_json::to_value(&activity).unwrap(), raw);
    }

    #[test]
    fn test_child_iri() {
        let base = iri("https://a.example/services/anchor");
        assert_eq!(
            child_iri(&base, &["keys", "main-key"]).unwrap().as_str(),
            "https://a.example/services/anchor/keys/main-key"
        );
        assert_eq!(
            child_iri(&iri("https://a.example/services/anchor/"), &["outbox"]).unwrap().as_str(),
            "https://a.example/services/anchor/outbox"
        );
        assert_eq!(
            child_iri(&base, &["https://b.example/x", "likes"]).unwrap().as_str(),
            "https://a.example/services/anchor/https:%2F%2Fb.example%2Fx/likes"
        );
        assert!(child_iri(&iri("mailto:someone@a.example"), &["x"]).is_err());
    }

    #[test]
    fn test_collection_item_untagged() {
        let items: Vec<CollectionItem> = serde_json::from_value(json!([
            "https://a.example/x",
            {"type": "Like", "actor": "https://a.example/y", "object": "https://a.example/x"}
        ]))
        .unwrap();

        assert!(matches!(items[0], CollectionItem::Iri(_)));
        assert!(matches!(items[1], CollectionItem::Activity(_)));
    }
}
