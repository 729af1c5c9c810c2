//! State changer trait.

use crate::types::{ContentItem, ContentState};

/// Strategy deciding lifecycle states around versioning.
///
/// Callers pass a state changer to the recursive cloner; the cloner invokes
/// [`StateChanger::on_cloned`] for every copied node and never picks a state
/// on its own.
pub trait StateChanger: Send + Sync {
    /// Move an item to a new lifecycle state.
    fn change_to(&self, item: &mut ContentItem, state: ContentState);

    /// Called with each original node and its fresh copy.
    fn on_cloned(&self, original: &ContentItem, clone: &mut ContentItem) {
        let _ = (original, clone);
    }
}

/// Leaves every cloned node in the state of its original.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepState;

impl StateChanger for KeepState {
    fn change_to(&self, item: &mut ContentItem, state: ContentState) {
        item.state = state;
    }
}
