//! Content item types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::detail::{DetailCollection, DetailValue};
use super::state::ContentState;

/// Identity of a persisted content item.
///
/// Ids are assigned by the item store on first persistence. Relations between
/// items (parent, version-of, links) are always expressed through ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub i64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        ItemId(id)
    }
}

/// A node in the content tree.
///
/// A parent owns its children in order. Snapshot trees produced by the cloner
/// are freestanding: their nodes have no id and point back at their masters
/// through `version_of`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Identity, `None` until the item store persists the item.
    pub id: Option<ItemId>,
    /// Type discriminator, e.g. `"NormalPage"`.
    pub item_type: String,
    pub title: String,
    /// URL segment.
    pub name: Option<String>,
    pub parent: Option<ItemId>,
    /// Slot among siblings this item is placed in.
    pub zone_name: Option<String>,
    pub sort_order: i32,
    pub visible: bool,
    pub state: ContentState,
    pub version_index: i32,
    /// Master item this item is a version of.
    pub version_of: Option<ItemId>,
    pub saved_by: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub published: Option<DateTime<Utc>>,
    pub expires: Option<DateTime<Utc>>,
    pub details: BTreeMap<String, DetailValue>,
    pub detail_collections: BTreeMap<String, DetailCollection>,
    pub children: Vec<ContentItem>,
}

impl ContentItem {
    /// Create a new, unsaved item.
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            item_type: "ContentItem".to_string(),
            title: title.into(),
            name: None,
            parent: None,
            zone_name: None,
            sort_order: 0,
            visible: true,
            state: ContentState::New,
            version_index: 0,
            version_of: None,
            saved_by: None,
            created: now,
            updated: now,
            published: None,
            expires: None,
            details: BTreeMap::new(),
            detail_collections: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Set the type discriminator.
    pub fn with_type(mut self, item_type: impl Into<String>) -> Self {
        self.item_type = item_type.into();
        self
    }

    /// Set the URL segment.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the zone this item is placed in.
    pub fn with_zone(mut self, zone_name: impl Into<String>) -> Self {
        self.zone_name = Some(zone_name.into());
        self
    }

    /// Set the lifecycle state.
    pub fn with_state(mut self, state: ContentState) -> Self {
        self.state = state;
        self
    }

    /// Set the sibling ordering.
    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// Place this item under a persisted parent.
    pub fn with_parent(mut self, parent: ItemId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Append a child, giving it this item's id as parent when one exists.
    pub fn add_child(&mut self, mut child: ContentItem) {
        child.parent = self.id;
        self.children.push(child);
    }

    /// Id of the master item this item versions, or its own id when it is
    /// not a version of anything.
    pub fn master_id(&self) -> Option<ItemId> {
        self.version_of.or(self.id)
    }

    /// Get a detail value by name.
    pub fn detail(&self, name: &str) -> Option<&DetailValue> {
        self.details.get(name)
    }

    /// Set a detail value, returning the previous value.
    pub fn set_detail(
        &mut self,
        name: impl Into<String>,
        value: impl Into<DetailValue>,
    ) -> Option<DetailValue> {
        self.details.insert(name.into(), value.into())
    }

    /// Get a detail collection by name.
    pub fn detail_collection(&self, name: &str) -> Option<&DetailCollection> {
        self.detail_collections.get(name)
    }

    /// Get a detail collection by name, creating an empty one if missing.
    pub fn detail_collection_mut(&mut self, name: &str) -> &mut DetailCollection {
        self.detail_collections.entry(name.to_string()).or_default()
    }

    /// Iterate over this item and all descendants, depth first, parents
    /// before children.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Number of nodes in the subtree rooted at this item.
    pub fn subtree_len(&self) -> usize {
        self.descendants().count()
    }

    /// Children in a given zone, in order.
    pub fn children_in_zone<'a>(&'a self, zone: &'a str) -> impl Iterator<Item = &'a ContentItem> + 'a {
        self.children
            .iter()
            .filter(move |c| c.zone_name.as_deref() == Some(zone))
    }
}

impl std::ops::Index<&str> for ContentItem {
    type Output = DetailValue;

    /// Panics when the detail is missing, like map indexing.
    fn index(&self, name: &str) -> &Self::Output {
        &self.details[name]
    }
}

/// Depth-first iterator over a content subtree.
pub struct Descendants<'a> {
    stack: Vec<&'a ContentItem>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a ContentItem;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.stack.pop()?;
        self.stack.extend(item.children.iter().rev());
        Some(item)
    }
}
