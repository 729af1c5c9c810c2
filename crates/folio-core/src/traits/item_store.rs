//! Item store trait.

use crate::error::FolioResult;
use crate::types::{ContentItem, ItemId};

/// Persistence for live (master) content items.
///
/// The versioning core only reads through this trait: it resolves the
/// `version_of` relations of rebuilt version trees and looks up masters.
#[cfg_attr(test, mockall::automock)]
pub trait ItemStore: Send + Sync {
    /// Persist an item and its children, assigning ids to new items.
    fn save(&self, item: &mut ContentItem) -> FolioResult<ItemId>;

    /// Find an item by id, with its children attached in order.
    fn find_by_id(&self, id: ItemId) -> FolioResult<Option<ContentItem>>;

    /// Whether an item with this id exists.
    fn exists(&self, id: ItemId) -> FolioResult<bool> {
        Ok(self.find_by_id(id)?.is_some())
    }
}
