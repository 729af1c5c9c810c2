//! In-memory item store.
//!
//! Items are kept flat in an arena keyed by id. Parent/child relations live
//! only as parent ids and trees are reassembled on read.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use chrono::Utc;
use tracing::debug;

use crate::error::{FolioError, FolioResult};
use crate::traits::ItemStore;
use crate::types::{ContentItem, ItemId};

/// Arena-backed [`ItemStore`] for embedding and tests.
pub struct InMemoryItemStore {
    items: RwLock<HashMap<ItemId, ContentItem>>,
    next_id: AtomicI64,
}

impl Default for InMemoryItemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Remove an item row. Children rows are left in place.
    pub fn remove(&self, id: ItemId) -> FolioResult<Option<ContentItem>> {
        let mut items = self
            .items
            .write()
            .map_err(|e| FolioError::Internal(e.to_string()))?;
        Ok(items.remove(&id))
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn save_row(
        &self,
        items: &mut HashMap<ItemId, ContentItem>,
        item: &mut ContentItem,
    ) -> ItemId {
        let id = match item.id {
            Some(id) => id,
            None => {
                let id = ItemId(self.next_id.fetch_add(1, Ordering::SeqCst));
                item.id = Some(id);
                id
            }
        };
        item.updated = Utc::now();

        for child in item.children.iter_mut() {
            child.parent = Some(id);
            self.save_row(items, child);
        }

        let mut row = item.clone();
        row.children = Vec::new();
        items.insert(id, row);
        id
    }

    fn assemble(
        items: &HashMap<ItemId, ContentItem>,
        id: ItemId,
        visited: &mut HashSet<ItemId>,
    ) -> Option<ContentItem> {
        if !visited.insert(id) {
            return None;
        }
        let mut item = items.get(&id)?.clone();

        let mut child_ids: Vec<(i32, ItemId)> = items
            .values()
            .filter(|row| row.parent == Some(id))
            .filter_map(|row| row.id.map(|child_id| (row.sort_order, child_id)))
            .collect();
        child_ids.sort();

        item.children = child_ids
            .into_iter()
            .filter_map(|(_, child_id)| Self::assemble(items, child_id, visited))
            .collect();
        Some(item)
    }
}

impl ItemStore for InMemoryItemStore {
    fn save(&self, item: &mut ContentItem) -> FolioResult<ItemId> {
        let mut items = self
            .items
            .write()
            .map_err(|e| FolioError::Internal(e.to_string()))?;
        let id = self.save_row(&mut items, item);
        debug!(item_id = %id, title = %item.title, "saved item");
        Ok(id)
    }

    fn find_by_id(&self, id: ItemId) -> FolioResult<Option<ContentItem>> {
        let items = self
            .items
            .read()
            .map_err(|e| FolioError::Internal(e.to_string()))?;
        Ok(Self::assemble(&items, id, &mut HashSet::new()))
    }

    fn exists(&self, id: ItemId) -> FolioResult<bool> {
        let items = self
            .items
            .read()
            .map_err(|e| FolioError::Internal(e.to_string()))?;
        Ok(items.contains_key(&id))
    }
}
