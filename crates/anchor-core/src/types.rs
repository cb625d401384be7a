//! Core types for reference collections

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Kinds of reference collections attached to an object IRI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceType {
    /// Actors following the object
    Follower,
    /// Actors the object follows
    Following,
    /// Actors witnessing the object's anchors
    Witness,
    /// Actors the object witnesses for
    Witnessing,
    /// Objects the actor liked
    Liked,
    /// Activities posted by the actor
    Outbox,
    /// Activities received by the actor
    Inbox,
    /// Announce activities referencing the object
    Share,
    /// Like activities referencing the object
    Like,
}

impl ReferenceType {
    /// All reference types, in a stable order
    pub const ALL: [ReferenceType; 9] = [
        ReferenceType::Follower,
        ReferenceType::Following,
        ReferenceType::Witness,
        ReferenceType::Witnessing,
        ReferenceType::Liked,
        ReferenceType::Outbox,
        ReferenceType::Inbox,
        ReferenceType::Share,
        ReferenceType::Like,
    ];

    /// Presentation rules for this reference type.
    ///
    /// The table is fixed: the shape and order of a collection never depend on the
    /// request that reads it.
    pub fn collection_spec(self) -> CollectionSpec {
        use CollectionShape::{Ordered, Unordered};
        use ItemKind::{Activity, Reference};
        use SortOrder::{Ascending, Descending};

        let (shape, sort_order, items) = match self {
            ReferenceType::Follower
            | ReferenceType::Following
            | ReferenceType::Witness
            | ReferenceType::Witnessing => (Unordered, Ascending, Reference),
            ReferenceType::Liked => (Ordered, Ascending, Reference),
            ReferenceType::Outbox | ReferenceType::Inbox => (Ordered, Descending, Activity),
            ReferenceType::Share | ReferenceType::Like => (Ordered, Ascending, Activity),
        };

        CollectionSpec {
            reference_type: self,
            shape,
            sort_order,
            items,
        }
    }

    /// Path segment under which the collection is served
    pub fn path_segment(self) -> &'static str {
        match self {
            ReferenceType::Follower => "followers",
            ReferenceType::Following => "following",
            ReferenceType::Witness => "witnesses",
            ReferenceType::Witnessing => "witnessing",
            ReferenceType::Liked => "liked",
            ReferenceType::Outbox => "outbox",
            ReferenceType::Inbox => "inbox",
            ReferenceType::Share => "shares",
            ReferenceType::Like => "likes",
        }
    }
}

impl std::fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReferenceType::Follower => "follower",
            ReferenceType::Following => "following",
            ReferenceType::Witness => "witness",
            ReferenceType::Witnessing => "witnessing",
            ReferenceType::Liked => "liked",
            ReferenceType::Outbox => "outbox",
            ReferenceType::Inbox => "inbox",
            ReferenceType::Share => "share",
            ReferenceType::Like => "like",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for ReferenceType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "follower" | "followers" => Ok(ReferenceType::Follower),
            "following" => Ok(ReferenceType::Following),
            "witness" | "witnesses" => Ok(ReferenceType::Witness),
            "witnessing" => Ok(ReferenceType::Witnessing),
            "liked" => Ok(ReferenceType::Liked),
            "outbox" => Ok(ReferenceType::Outbox),
            "inbox" => Ok(ReferenceType::Inbox),
            "share" | "shares" => Ok(ReferenceType::Share),
            "like" | "likes" => Ok(ReferenceType::Like),
            _ => Err(CoreError::UnknownReferenceType(s.to_string())),
        }
    }
}

/// Order in which a collection's items are presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Oldest first; bucket 0 is the first page
    #[default]
    Ascending,
    /// Newest first; the highest bucket is the first page
    Descending,
}

/// Output shape of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionShape {
    /// `Collection` / `CollectionPage` with `items`
    Unordered,
    /// `OrderedCollection` / `OrderedCollectionPage` with `orderedItems`
    Ordered,
}

/// What a collection's items are
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// Bare IRIs
    Reference,
    /// Embedded activity objects
    Activity,
}

/// Presentation rules bound to a reference type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSpec {
    pub reference_type: ReferenceType,
    pub shape: CollectionShape,
    pub sort_order: SortOrder,
    pub items: ItemKind,
}

/// Lifecycle state of an anchor link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorLinkStatus {
    /// Confirmed propagation; never expires
    Processed,
    /// Gossiped but unacknowledged; carries an expiry time
    Pending,
}

impl AnchorLinkStatus {
    /// Tag value used by the store for this status
    pub fn as_str(self) -> &'static str {
        match self {
            AnchorLinkStatus::Processed => "processed",
            AnchorLinkStatus::Pending => "pending",
        }
    }
}

impl std::fmt::Display for AnchorLinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
