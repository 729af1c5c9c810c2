//! Detached copies of content items for versioning.

use crate::traits::StateChanger;
use crate::types::ContentItem;

impl ContentItem {
    /// Copy this item, without children, as a version of its master.
    ///
    /// The copy has no id and its `version_of` points at this item, or at
    /// this item's own master when it is already a version.
    pub fn clone_for_versioning(&self) -> ContentItem {
        let mut copy = detached_copy(self);
        copy.children = Vec::new();
        copy
    }

    /// Copy this item and all descendants as versions of their masters.
    ///
    /// Children are visited in `(sort_order, position)` order so repeated
    /// snapshots of an unchanged tree produce identical blobs. The state
    /// changer is invoked once for every copied node.
    pub fn clone_for_versioning_recursive(&self, state_changer: &dyn StateChanger) -> ContentItem {
        let mut copy = self.clone_for_versioning();
        state_changer.on_cloned(self, &mut copy);

        let mut ordered: Vec<&ContentItem> = self.children.iter().collect();
        ordered.sort_by_key(|child| child.sort_order);

        copy.children = ordered
            .into_iter()
            .map(|child| {
                let mut child_copy = child.clone_for_versioning_recursive(state_changer);
                // The copied parent is unsaved, so there is no id to point at.
                child_copy.parent = None;
                child_copy
            })
            .collect();
        copy
    }
}

fn detached_copy(item: &ContentItem) -> ContentItem {
    ContentItem {
        id: None,
        version_of: item.version_of.or(item.id),
        item_type: item.item_type.clone(),
        title: item.title.clone(),
        name: item.name.clone(),
        parent: item.parent,
        zone_name: item.zone_name.clone(),
        sort_order: item.sort_order,
        visible: item.visible,
        state: item.state,
        version_index: item.version_index,
        saved_by: item.saved_by.clone(),
        created: item.created,
        updated: item.updated,
        published: item.published,
        expires: item.expires,
        details: item.details.clone(),
        detail_collections: item.detail_collections.clone(),
        children: Vec::new(),
    }
}
