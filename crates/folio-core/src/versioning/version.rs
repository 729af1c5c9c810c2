//! Content version records.
//!
//! A record is an immutable snapshot of a master item's subtree. The rebuilt
//! tree is derived lazily from the stored blob and cached on the record.

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::error::{ErrorCode, FolioError, FolioResult};
use crate::traits::ItemStore;
use crate::types::{ContentItem, ContentState, ItemId};
use crate::versioning::serializer::ItemSerializer;

/// A stored snapshot of a master item's subtree.
#[derive(Clone, Serialize)]
pub struct ContentVersion {
    /// Unique record identifier.
    pub id: Uuid,
    /// Master item this version belongs to.
    pub master_id: ItemId,
    /// Version index of the snapshot root at save time.
    pub version_index: i32,
    /// Title of the snapshot root at save time.
    pub title: String,
    /// Lifecycle state of the snapshot root at save time.
    pub state: ContentState,
    /// Actor that saved this version.
    pub saved_by: Option<String>,
    /// When this version was saved.
    pub saved: DateTime<Utc>,
    /// Published timestamp copied from the snapshot root.
    pub published: Option<DateTime<Utc>>,
    /// Last actor to save the snapshot root before it was versioned.
    pub published_by: Option<String>,
    pub expires: Option<DateTime<Utc>>,
    /// Number of items in the snapshot, root included.
    pub item_count: u32,
    /// Serialized subtree.
    pub version_data: String,
    #[serde(skip)]
    tree: OnceCell<ContentItem>,
    #[serde(skip)]
    resolver: Option<Arc<dyn ItemStore>>,
    #[serde(skip)]
    relink: bool,
}

impl ContentVersion {
    /// Build a record for a snapshot about to be stored.
    pub fn from_snapshot(
        master_id: ItemId,
        snapshot: &ContentItem,
        version_data: String,
        saved_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            master_id,
            version_index: snapshot.version_index,
            title: snapshot.title.clone(),
            state: snapshot.state,
            saved_by: Some(saved_by.into()),
            saved: Utc::now(),
            published: snapshot.published,
            published_by: snapshot.saved_by.clone(),
            expires: snapshot.expires,
            item_count: snapshot.subtree_len() as u32,
            version_data,
            tree: OnceCell::new(),
            resolver: None,
            relink: false,
        }
    }

    /// Rebuild a record from stored columns.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        id: Uuid,
        master_id: ItemId,
        version_index: i32,
        title: String,
        state: ContentState,
        saved_by: Option<String>,
        saved: DateTime<Utc>,
        published: Option<DateTime<Utc>>,
        published_by: Option<String>,
        expires: Option<DateTime<Utc>>,
        item_count: u32,
        version_data: String,
    ) -> Self {
        Self {
            id,
            master_id,
            version_index,
            title,
            state,
            saved_by,
            saved,
            published,
            published_by,
            expires,
            item_count,
            version_data,
            tree: OnceCell::new(),
            resolver: None,
            relink: false,
        }
    }

    /// Attach the item store used to resolve masters. When `relink` is set,
    /// every `version_of` in the rebuilt tree must resolve to a live item.
    pub fn with_resolver(mut self, items: Arc<dyn ItemStore>, relink: bool) -> Self {
        self.resolver = Some(items);
        self.relink = relink;
        self
    }

    /// Whether this version is a draft candidate.
    pub fn is_draft(&self) -> bool {
        self.state.is_draft()
    }

    /// The rebuilt subtree, decoded on first access.
    pub fn version(&self) -> FolioResult<&ContentItem> {
        self.tree.get_or_try_init(|| self.rebuild())
    }

    /// Take the rebuilt subtree out of this record.
    pub fn into_version(self) -> FolioResult<ContentItem> {
        self.version()?;
        self.tree
            .into_inner()
            .ok_or_else(|| FolioError::Internal("version tree was not cached".to_string()))
    }

    /// Drop the cached subtree so the next access decodes the blob again.
    pub fn invalidate(&mut self) {
        self.tree = OnceCell::new();
    }

    /// Look up the live master item.
    pub fn master(&self) -> FolioResult<ContentItem> {
        let items = self.resolver.as_ref().ok_or_else(|| {
            FolioError::Internal("no item store attached to version record".to_string())
        })?;
        items.find_by_id(self.master_id)?.ok_or_else(|| {
            warn!(master_id = %self.master_id, version_id = %self.id, "master item is gone");
            FolioError::dangling_master(self.master_id)
        })
    }

    /// Listing view without the blob.
    pub fn summary(&self) -> VersionSummary {
        VersionSummary {
            id: self.id,
            master_id: self.master_id,
            version_index: self.version_index,
            title: self.title.clone(),
            state: self.state,
            saved_by: self.saved_by.clone(),
            saved: self.saved,
            published: self.published,
            item_count: self.item_count,
        }
    }

    fn rebuild(&self) -> FolioResult<ContentItem> {
        let tree = ItemSerializer::new().deserialize(&self.version_data)?;

        if tree.version_index != self.version_index {
            return Err(FolioError::Deserialization {
                message: format!(
                    "version {} of master {} decoded with version index {}",
                    self.version_index, self.master_id, tree.version_index
                ),
                code: ErrorCode::DesIndexMismatch,
                source: None,
            });
        }

        if self.relink {
            if let Some(items) = &self.resolver {
                relink(items.as_ref(), &tree)?;
            }
        }
        Ok(tree)
    }
}

/// Check that every node's `version_of` resolves to a live item.
fn relink(items: &dyn ItemStore, tree: &ContentItem) -> FolioResult<()> {
    for node in tree.descendants() {
        if let Some(master_id) = node.version_of {
            if !items.exists(master_id)? {
                warn!(item_id = %master_id, title = %node.title, "version references a missing master");
                return Err(FolioError::dangling_master(master_id));
            }
        }
    }
    Ok(())
}

impl fmt::Debug for ContentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentVersion")
            .field("id", &self.id)
            .field("master_id", &self.master_id)
            .field("version_index", &self.version_index)
            .field("title", &self.title)
            .field("state", &self.state)
            .field("saved_by", &self.saved_by)
            .field("saved", &self.saved)
            .field("published", &self.published)
            .field("item_count", &self.item_count)
            .finish_non_exhaustive()
    }
}

/// Light listing view of a version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionSummary {
    pub id: Uuid,
    pub master_id: ItemId,
    pub version_index: i32,
    pub title: String,
    pub state: ContentState,
    pub saved_by: Option<String>,
    pub saved: DateTime<Utc>,
    pub published: Option<DateTime<Utc>>,
    pub item_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::InMemoryItemStore;

    fn snapshot() -> ContentItem {
        let mut page = ContentItem::new("page").with_state(ContentState::Draft);
        page.version_of = Some(ItemId(1));
        page.version_index = 2;
        page.saved_by = Some("editor".to_string());
        page.add_child(ContentItem::new("part"));
        page
    }

    fn record_for(item: &ContentItem) -> ContentVersion {
        let blob = ItemSerializer::new().serialize(item).unwrap();
        ContentVersion::from_snapshot(ItemId(1), item, blob, "Hello")
    }

    #[test]
    fn test_from_snapshot_copies_root_fields() {
        let item = snapshot();
        let record = record_for(&item);

        assert_eq!(record.version_index, 2);
        assert_eq!(record.state, ContentState::Draft);
        assert_eq!(record.saved_by.as_deref(), Some("Hello"));
        assert_eq!(record.published_by.as_deref(), Some("editor"));
        assert_eq!(record.item_count, 2);
        assert!(record.is_draft());
    }

    #[test]
    fn test_version_is_cached() {
        let record = record_for(&snapshot());
        let first = record.version().unwrap() as *const ContentItem;
        let second = record.version().unwrap() as *const ContentItem;
        assert_eq!(first, second);
    }

    #[test]
    fn test_index_mismatch_is_reported() {
        let item = snapshot();
        let mut record = record_for(&item);
        record.version_index = 9;

        let err = record.version().unwrap_err();
        assert_eq!(err.code(), ErrorCode::DesIndexMismatch);
    }

    #[test]
    fn test_relink_reports_dangling_master() {
        let items: Arc<dyn ItemStore> = Arc::new(InMemoryItemStore::new());
        let record = record_for(&snapshot()).with_resolver(items, true);

        let err = record.version().unwrap_err();
        assert!(matches!(err, FolioError::DanglingMaster { item_id, .. } if item_id == ItemId(1)));
        assert!(matches!(record.master(), Err(FolioError::DanglingMaster { .. })));
    }

    #[test]
    fn test_invalidate_drops_cache() {
        let mut record = record_for(&snapshot());
        record.version().unwrap();
        record.invalidate();
        assert_eq!(record.version().unwrap().title, "page");
        assert_eq!(record.into_version().unwrap().children.len(), 1);
    }

    #[test]
    fn test_summary_serializes_without_blob() {
        let record = record_for(&snapshot());
        let json = serde_json::to_value(record.summary()).unwrap();
        assert_eq!(json["version_index"], 2);
        assert!(json.get("version_data").is_none());
    }
}
